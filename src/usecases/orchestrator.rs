//! Concurrent chunk dispatch.
//!
//! Every chunk becomes one task gated by a semaphore (bounded pool). All
//! tasks run to completion; the join returns one outcome per chunk, in
//! input order, whatever order they finished in.

use crate::domain::{AiError, Chunk, ChunkOutcome, OperationKind, PromptRequest};
use crate::ports::AiPort;
use crate::usecases::prompts::system_prompt;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Fans chunks out to the AI port through a bounded worker pool.
pub struct ChunkOrchestrator {
    ai: Arc<dyn AiPort>,
    max_concurrency: usize,
}

impl ChunkOrchestrator {
    pub fn new(ai: Arc<dyn AiPort>, max_concurrency: usize) -> Self {
        Self {
            ai,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Dispatch every chunk and wait for all of them to settle.
    ///
    /// A failing chunk never cancels its siblings. The result holds exactly
    /// one outcome per input chunk, sorted by chunk index.
    pub async fn dispatch(
        &self,
        operation: OperationKind,
        model: &str,
        timeout: Duration,
        chunks: Vec<Chunk>,
    ) -> Vec<ChunkOutcome> {
        let total = chunks.len();
        info!(
            operation = %operation,
            chunks = total,
            max_concurrency = self.max_concurrency,
            "dispatching chunks"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut indices = Vec::with_capacity(total);
        let mut handles = Vec::with_capacity(total);

        for chunk in chunks {
            let index = chunk.index;
            let sem = Arc::clone(&semaphore);
            let ai = Arc::clone(&self.ai);
            let request = PromptRequest {
                operation,
                model: model.to_string(),
                system_prompt: system_prompt(operation).to_string(),
                content: chunk.content,
                timeout,
            };

            indices.push(index);
            handles.push(tokio::spawn(async move {
                let _permit = match sem.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return ChunkOutcome::Failure {
                            index,
                            error: AiError::Internal(format!("worker pool closed: {}", e)),
                        };
                    }
                };

                match ai.complete(&request).await {
                    Ok(reply) => {
                        debug!(index, reply_len = reply.len(), "chunk succeeded");
                        ChunkOutcome::Success { index, reply }
                    }
                    Err(error) => {
                        warn!(index, error = %error, "chunk failed");
                        ChunkOutcome::Failure { index, error }
                    }
                }
            }));
        }

        let mut outcomes: Vec<ChunkOutcome> = indices
            .into_iter()
            .zip(join_all(handles).await)
            .map(|(index, joined)| {
                joined.unwrap_or_else(|e| ChunkOutcome::Failure {
                    index,
                    error: AiError::Internal(format!("chunk worker failed: {}", e)),
                })
            })
            .collect();
        outcomes.sort_by_key(ChunkOutcome::index);

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            operation = %operation,
            chunks = total,
            failed,
            "all chunks settled"
        );

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockAiAdapter, MockReply};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn chunks(contents: &[&str]) -> Vec<Chunk> {
        contents
            .iter()
            .enumerate()
            .map(|(index, c)| Chunk {
                index,
                content: c.to_string(),
                size_bound: 10,
            })
            .collect()
    }

    /// Tracks the highest number of calls in flight at once.
    struct ConcurrencyProbe {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl AiPort for ConcurrencyProbe {
        async fn complete(&self, request: &PromptRequest) -> Result<String, AiError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(request.content.clone())
        }
    }

    #[tokio::test]
    async fn test_outcomes_follow_input_order_not_completion_order() {
        // Later chunks finish first.
        let ai = Arc::new(MockAiAdapter::with_responder(|req: &PromptRequest| {
            let n: u64 = req.content.parse().unwrap();
            MockReply::ok(format!("reply {}", n)).after(Duration::from_millis(80 - n * 20))
        }));
        let orchestrator = ChunkOrchestrator::new(ai, 4);

        let outcomes = orchestrator
            .dispatch(
                OperationKind::Analyze,
                "m",
                Duration::from_secs(1),
                chunks(&["0", "1", "2", "3"]),
            )
            .await;

        let replies: Vec<(usize, String)> = outcomes
            .into_iter()
            .map(|o| match o {
                ChunkOutcome::Success { index, reply } => (index, reply),
                ChunkOutcome::Failure { index, error } => panic!("chunk {} failed: {}", index, error),
            })
            .collect();
        assert_eq!(
            replies,
            vec![
                (0, "reply 0".to_string()),
                (1, "reply 1".to_string()),
                (2, "reply 2".to_string()),
                (3, "reply 3".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let ai = Arc::new(MockAiAdapter::with_responder(|req: &PromptRequest| {
            if req.content == "bad" {
                MockReply::err(AiError::Timeout("chunk".into()))
            } else {
                MockReply::ok("ok").after(Duration::from_millis(30))
            }
        }));
        let orchestrator = ChunkOrchestrator::new(ai.clone(), 2);

        let outcomes = orchestrator
            .dispatch(
                OperationKind::Evaluate,
                "m",
                Duration::from_secs(1),
                chunks(&["a", "bad", "c"]),
            )
            .await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_success());
        assert!(matches!(
            &outcomes[1],
            ChunkOutcome::Failure { index: 1, error: AiError::Timeout(_) }
        ));
        assert!(outcomes[2].is_success());
        assert_eq!(ai.calls(), 3);
    }

    #[tokio::test]
    async fn test_panicking_worker_fails_only_its_chunk() {
        let ai = Arc::new(MockAiAdapter::with_responder(|req: &PromptRequest| {
            if req.content == "boom" {
                panic!("responder exploded");
            }
            MockReply::ok(format!("ok {}", req.content)).after(Duration::from_millis(10))
        }));
        let orchestrator = ChunkOrchestrator::new(ai, 2);

        let outcomes = orchestrator
            .dispatch(
                OperationKind::Analyze,
                "m",
                Duration::from_secs(1),
                chunks(&["a", "boom", "c"]),
            )
            .await;

        assert_eq!(outcomes.len(), 3);
        assert!(matches!(
            &outcomes[0],
            ChunkOutcome::Success { index: 0, reply } if reply == "ok a"
        ));
        assert!(matches!(
            &outcomes[1],
            ChunkOutcome::Failure { index: 1, error: AiError::Internal(_) }
        ));
        assert!(matches!(
            &outcomes[2],
            ChunkOutcome::Success { index: 2, reply } if reply == "ok c"
        ));
    }

    #[tokio::test]
    async fn test_pool_bounds_concurrency() {
        let probe = Arc::new(ConcurrencyProbe {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let orchestrator = ChunkOrchestrator::new(probe.clone(), 2);

        let outcomes = orchestrator
            .dispatch(
                OperationKind::ExtractClauses,
                "m",
                Duration::from_secs(1),
                chunks(&["a", "b", "c", "d", "e", "f"]),
            )
            .await;

        assert_eq!(outcomes.len(), 6);
        assert!(outcomes.iter().all(ChunkOutcome::is_success));
        assert!(probe.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_prompt_carries_operation_model_and_instruction() {
        let ai = Arc::new(MockAiAdapter::with_responder(|req: &PromptRequest| {
            assert_eq!(req.operation, OperationKind::ExtractClauses);
            assert_eq!(req.model, "deepseek-chat");
            assert!(req.system_prompt.contains("JSON array"));
            assert_eq!(req.timeout, Duration::from_secs(7));
            MockReply::ok("[]")
        }));
        let orchestrator = ChunkOrchestrator::new(ai, 4);

        let outcomes = orchestrator
            .dispatch(
                OperationKind::ExtractClauses,
                "deepseek-chat",
                Duration::from_secs(7),
                chunks(&["x"]),
            )
            .await;

        assert!(outcomes[0].is_success());
    }
}
