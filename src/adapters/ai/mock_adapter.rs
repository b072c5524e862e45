//! Mock AI adapter for running without API calls.
//!
//! Returns canned per-operation replies for development, and can be scripted
//! per prompt for tests (custom replies, failures, latency).

use crate::domain::{AiError, OperationKind, PromptRequest};
use crate::ports::AiPort;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

/// Scripted answer for one prompt.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub delay: Duration,
    pub result: Result<String, AiError>,
}

impl MockReply {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(text.into()),
        }
    }

    pub fn err(error: AiError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(error),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Responder = dyn Fn(&PromptRequest) -> MockReply + Send + Sync;

/// Mock AI adapter.
///
/// Without a responder it answers every operation with a plausible canned
/// reply after a simulated network delay.
pub struct MockAiAdapter {
    /// Simulated network delay in milliseconds (canned mode only).
    delay_ms: u64,
    responder: Option<Box<Responder>>,
    calls: AtomicUsize,
}

impl MockAiAdapter {
    /// Create a new mock adapter with default delay (100ms).
    pub fn new() -> Self {
        Self {
            delay_ms: 100,
            responder: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock adapter with custom delay.
    pub fn with_delay(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Self::new()
        }
    }

    /// Answer every prompt through `responder`.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&PromptRequest) -> MockReply + Send + Sync + 'static,
    {
        Self {
            delay_ms: 0,
            responder: Some(Box::new(responder)),
            calls: AtomicUsize::new(0),
        }
    }

    /// Answer every prompt with the same text.
    pub fn with_reply(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        Self::with_responder(move |_| MockReply::ok(reply.clone()))
    }

    /// Fail every prompt with the same error.
    pub fn with_error(error: AiError) -> Self {
        Self::with_responder(move |_| MockReply::err(error.clone()))
    }

    /// Number of prompts received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn canned_reply(request: &PromptRequest) -> String {
        match request.operation {
            OperationKind::Analyze => format!(
                "[MOCK] Simulated analysis of {} characters. In production this would list \
                 the clauses found, the main risks and obligations of each party, and an \
                 assessment of legal soundness.",
                request.content.chars().count()
            ),
            OperationKind::Evaluate => "[MOCK] The contract is APPROVED. Clauses are clear, \
                 obligations are balanced and termination terms are present."
                .to_string(),
            OperationKind::ExtractClauses => r#"[
  {"type": "Payment Terms", "content": "[MOCK] Payment due within 30 days of invoice.", "risk_level": "low", "obligations": ["Pay invoices within 30 days"]},
  {"type": "Termination", "content": "[MOCK] Either party may terminate with 30 days notice.", "risk_level": "medium", "obligations": ["Give 30 days written notice"]}
]"#
            .to_string(),
            OperationKind::ConnectionTest => "pong".to_string(),
        }
    }
}

impl Default for MockAiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AiPort for MockAiAdapter {
    async fn complete(&self, request: &PromptRequest) -> Result<String, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(responder) = &self.responder {
            let reply = responder(request);
            if !reply.delay.is_zero() {
                tokio::time::sleep(reply.delay).await;
            }
            return reply.result;
        }

        info!(
            operation = %request.operation,
            content_len = request.content.len(),
            "[MOCK] Simulating AI reply"
        );
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        Ok(Self::canned_reply(request))
    }
}
