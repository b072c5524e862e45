//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;

pub use entities::{
    AnalysisResult, Chunk, ChunkOutcome, ClauseExtraction, ClauseRecord, ContractReview,
    EvaluationResult, FALLBACK_MODEL, ModelKind, OperationKind, PromptRequest, RiskLevel,
    is_approved,
};
pub use errors::{AiError, ChunkError, DomainError};
