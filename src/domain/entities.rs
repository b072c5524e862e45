//! Domain entities. Pure data structures for the core business.
//!
//! No HTTP/IO types here; adapters map remote payloads into these.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// `model_used` marker on every degraded result envelope.
pub const FALLBACK_MODEL: &str = "Fallback Response";

/// Operation the core performs on a contract. Each maps to one model variant
/// and one fixed system instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Analyze,
    Evaluate,
    ExtractClauses,
    ConnectionTest,
}

impl OperationKind {
    /// Reasoning model for narrative work, chat model for structured output.
    pub fn model_kind(self) -> ModelKind {
        match self {
            Self::Analyze | Self::Evaluate => ModelKind::Reasoning,
            Self::ExtractClauses | Self::ConnectionTest => ModelKind::Chat,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Evaluate => "evaluate",
            Self::ExtractClauses => "extract_clauses",
            Self::ConnectionTest => "connection_test",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Reasoning,
    Chat,
}

/// One prompt sent to the remote reasoning service.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub operation: OperationKind,
    /// Remote model identifier (e.g. "deepseek-reasoner").
    pub model: String,
    pub system_prompt: String,
    pub content: String,
    /// Per-call timeout, enforced by the client.
    pub timeout: Duration,
}

/// A bounded, contiguous slice of contract text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 0-based position in the original text.
    pub index: usize,
    pub content: String,
    pub size_bound: usize,
}

/// Result of dispatching one chunk. Always carries the origin index.
#[derive(Debug, Clone)]
pub enum ChunkOutcome {
    Success { index: usize, reply: String },
    Failure { index: usize, error: super::AiError },
}

impl ChunkOutcome {
    pub fn index(&self) -> usize {
        match self {
            Self::Success { index, .. } | Self::Failure { index, .. } => *index,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Result of the "analyze" operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis: String,
    pub model_used: String,
}

/// Result of the "evaluate" operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub approved: bool,
    pub reasoning: String,
    pub model_used: String,
}

/// Approval heuristic: approved unless the text says "not approved" (any case).
pub fn is_approved(reasoning: &str) -> bool {
    !reasoning.to_lowercase().contains("not approved")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[serde(alias = "Low", alias = "LOW")]
    Low,
    #[serde(alias = "Medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "High", alias = "HIGH")]
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

/// One contract clause as extracted by the chat model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseRecord {
    #[serde(rename = "type")]
    pub clause_type: String,
    pub content: String,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub obligations: Vec<String>,
}

/// Result of the "extract_clauses" operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseExtraction {
    pub clauses: Vec<ClauseRecord>,
    pub clause_count: usize,
    pub model_used: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClauseExtraction {
    pub fn new(
        clauses: Vec<ClauseRecord>,
        model_used: impl Into<String>,
        error: Option<String>,
    ) -> Self {
        Self {
            clause_count: clauses.len(),
            clauses,
            model_used: model_used.into(),
            error,
        }
    }

    /// Empty result for when the service could not be used at all.
    pub fn fallback(error: impl Into<String>) -> Self {
        Self::new(Vec::new(), FALLBACK_MODEL, Some(error.into()))
    }
}

/// All three results for one contract, produced by a full review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractReview {
    pub title: String,
    pub analysis: AnalysisResult,
    pub evaluation: EvaluationResult,
    pub clauses: ClauseExtraction,
    /// Unix timestamp (seconds).
    pub reviewed_at: i64,
}
