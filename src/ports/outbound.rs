//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{
    AiError, AnalysisResult, ClauseExtraction, ContractReview, DomainError, EvaluationResult,
    OperationKind, PromptRequest,
};
use std::path::PathBuf;

/// Remote reasoning service. One prompt in, one reply text out.
///
/// Implementations must be safe to call from many tasks at once and must
/// never panic: every failure is reported as an [`AiError`].
#[async_trait::async_trait]
pub trait AiPort: Send + Sync {
    /// Send the prompt and return `choices[0].message.content`.
    ///
    /// Transient HTTP statuses are retried inside the adapter; the error
    /// returned is the final one.
    async fn complete(&self, request: &PromptRequest) -> Result<String, AiError>;
}

/// A cached facade result, keyed by operation and contract text digest.
#[derive(Debug, Clone)]
pub enum CachedResult {
    Analysis(AnalysisResult),
    Evaluation(EvaluationResult),
    Clauses(ClauseExtraction),
}

/// Result cache for duplicate contract texts.
#[async_trait::async_trait]
pub trait ResultCache: Send + Sync {
    /// Look up a live (non-expired) entry.
    async fn get(&self, operation: OperationKind, text_digest: &str) -> Option<CachedResult>;

    /// Store a result. Implementations may evict expired entries here.
    async fn put(&self, operation: OperationKind, text_digest: &str, result: CachedResult);
}

/// Report sink. Renders a full review for humans.
#[async_trait::async_trait]
pub trait ReportPort: Send + Sync {
    /// Write the review and return where it was stored.
    async fn write_review(&self, review: &ContractReview) -> Result<PathBuf, DomainError>;
}
