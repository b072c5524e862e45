//! DeepSeek adapter for contract analysis (OpenAI-compatible chat completions).
//!
//! Implements `AiPort`: one prompt per call, retries transient HTTP statuses
//! with exponential backoff and maps every transport failure into `AiError`.

use crate::domain::{AiError, PromptRequest};
use crate::ports::AiPort;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Statuses worth another attempt: rate limiting and gateway/server hiccups.
const RETRYABLE_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

/// Max characters of an error body kept in `AiError::Http`.
const ERROR_BODY_LIMIT: usize = 200;

/// Retry settings for transient HTTP statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (0-based): base, 2x base, 4x base, ... capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// OpenAI-compatible client for the DeepSeek reasoning service.
///
/// Holds one `reqwest::Client`, i.e. one connection pool shared by every
/// concurrent chunk call.
pub struct DeepSeekAdapter {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl DeepSeekAdapter {
    /// Create a new adapter.
    ///
    /// # Arguments
    /// * `api_url` - Endpoint (e.g., "https://api.deepseek.com/v1/chat/completions")
    /// * `api_key` - Bearer token
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn build_body(request: &PromptRequest) -> ChatRequest<'_> {
        ChatRequest {
            model: &request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.content,
                },
            ],
        }
    }

    /// Pull `choices[0].message.content` out of a raw response body.
    fn extract_content(body: &str) -> Result<String, AiError> {
        let response: ChatResponse = serde_json::from_str(body)
            .map_err(|e| AiError::MalformedResponse(format!("invalid response body: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                AiError::MalformedResponse("missing choices[0].message.content".to_string())
            })
    }
}

/// Map a reqwest transport error to `AiError`.
fn map_reqwest_error(err: reqwest::Error) -> AiError {
    if err.is_timeout() {
        AiError::Timeout(err.to_string())
    } else {
        AiError::Connection(err.to_string())
    }
}

fn truncate_body(text: &str) -> String {
    text.chars().take(ERROR_BODY_LIMIT).collect()
}

/// Chat completions request body.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Chat completions response (only the fields we read).
#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: Option<String>,
}

#[async_trait::async_trait]
impl AiPort for DeepSeekAdapter {
    async fn complete(&self, request: &PromptRequest) -> Result<String, AiError> {
        let body = Self::build_body(request);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            debug!(
                operation = %request.operation,
                model = %request.model,
                attempt,
                content_len = request.content.len(),
                "sending prompt to AI service"
            );

            let response = self
                .client
                .post(&self.api_url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .timeout(request.timeout)
                .json(&body)
                .send()
                .await
                .map_err(map_reqwest_error)?;

            let status = response.status();
            let text = response.text().await.map_err(map_reqwest_error)?;

            if status.is_success() {
                let reply = Self::extract_content(&text)?;
                info!(
                    operation = %request.operation,
                    attempt,
                    reply_len = reply.len(),
                    "AI reply received"
                );
                return Ok(reply);
            }

            let code = status.as_u16();
            if RETRYABLE_STATUSES.contains(&code) && attempt < self.retry.max_attempts {
                let wait = self.retry.delay_for(attempt - 1);
                warn!(
                    operation = %request.operation,
                    status = code,
                    attempt,
                    max_attempts = self.retry.max_attempts,
                    wait_ms = wait.as_millis() as u64,
                    "AI API returned retryable status, backing off"
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            warn!(status = code, body = %truncate_body(&text), "AI API returned error");
            return Err(AiError::Http {
                status: code,
                body: truncate_body(&text),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OperationKind;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const OK_BODY: &str = r#"{"choices":[{"message":{"role":"assistant","content":"Looks fine."}}]}"#;

    fn prompt(timeout: Duration) -> PromptRequest {
        PromptRequest {
            operation: OperationKind::Analyze,
            model: "deepseek-reasoner".to_string(),
            system_prompt: "You are a legal analyst.".to_string(),
            content: "short text".to_string(),
            timeout,
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
        }
    }

    /// Read one HTTP request (headers plus Content-Length body) and return it.
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Serve the given (status, body) pairs in order, one per connection.
    /// The last pair repeats once the script runs out.
    async fn serve(script: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = script[n.min(script.len() - 1)];
                let request = read_request(&mut stream).await;
                assert!(request.contains("Bearer test-key"));
                let response = format!(
                    "HTTP/1.1 {} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (format!("http://{}/v1/chat/completions", addr), hits)
    }

    #[test]
    fn test_retry_delays_double_and_cap() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(1),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(4), Duration::from_secs(1));
        assert_eq!(policy.delay_for(40), Duration::from_secs(1));
    }

    #[test]
    fn test_extract_content_missing_choices() {
        let err = DeepSeekAdapter::extract_content(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, AiError::MalformedResponse(_)));
        let err = DeepSeekAdapter::extract_content("not json").unwrap_err();
        assert!(matches!(err, AiError::MalformedResponse(_)));
    }

    #[test]
    fn test_request_body_shape() {
        let request = prompt(Duration::from_secs(1));
        let body = serde_json::to_value(DeepSeekAdapter::build_body(&request)).unwrap();
        assert_eq!(body["model"], "deepseek-reasoner");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "short text");
    }

    #[tokio::test]
    async fn test_complete_success() {
        let (url, hits) = serve(vec![(200, OK_BODY)]).await;
        let adapter = DeepSeekAdapter::new(url, "test-key".into()).with_retry(fast_retry());

        let reply = adapter.complete(&prompt(Duration::from_secs(5))).await.unwrap();

        assert_eq!(reply, "Looks fine.");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_status_then_succeeds() {
        let (url, hits) = serve(vec![(503, "{}"), (429, "{}"), (200, OK_BODY)]).await;
        let adapter = DeepSeekAdapter::new(url, "test-key".into()).with_retry(fast_retry());

        let reply = adapter.complete(&prompt(Duration::from_secs(5))).await.unwrap();

        assert_eq!(reply, "Looks fine.");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted_returns_http_error() {
        let (url, hits) = serve(vec![(502, "bad gateway")]).await;
        let adapter = DeepSeekAdapter::new(url, "test-key".into()).with_retry(fast_retry());

        let err = adapter
            .complete(&prompt(Duration::from_secs(5)))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            AiError::Http {
                status: 502,
                body: "bad gateway".into()
            }
        );
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_status_fails_immediately() {
        let (url, hits) = serve(vec![(401, r#"{"error":"bad key"}"#)]).await;
        let adapter = DeepSeekAdapter::new(url, "test-key".into()).with_retry(fast_retry());

        let err = adapter
            .complete(&prompt(Duration::from_secs(5)))
            .await
            .unwrap_err();

        assert!(matches!(err, AiError::Http { status: 401, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_content_is_malformed() {
        let (url, _) = serve(vec![(200, r#"{"id":"x"}"#)]).await;
        let adapter = DeepSeekAdapter::new(url, "test-key".into()).with_retry(fast_retry());

        let err = adapter
            .complete(&prompt(Duration::from_secs(5)))
            .await
            .unwrap_err();

        assert!(matches!(err, AiError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let _ = read_request(&mut stream).await;
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        });
        let adapter = DeepSeekAdapter::new(
            format!("http://{}/v1/chat/completions", addr),
            "test-key".into(),
        );

        let err = adapter
            .complete(&prompt(Duration::from_millis(200)))
            .await
            .unwrap_err();

        assert!(matches!(err, AiError::Timeout(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_refused_connection_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let adapter = DeepSeekAdapter::new(
            format!("http://{}/v1/chat/completions", addr),
            "test-key".into(),
        );

        let err = adapter
            .complete(&prompt(Duration::from_secs(2)))
            .await
            .unwrap_err();

        assert!(matches!(err, AiError::Connection(_)), "got {:?}", err);
    }
}
