//! Merges per-chunk outcomes into one result per operation.
//!
//! Outcomes are re-sorted by chunk index before formatting, so section
//! numbers always match the position of the chunk in the contract.

use crate::domain::{
    AiError, AnalysisResult, ChunkOutcome, ClauseExtraction, EvaluationResult, FALLBACK_MODEL,
    is_approved,
};
use crate::shared::config::ModelCatalog;
use crate::usecases::clause_parser::parse_clause_reply;
use tracing::warn;

pub const NO_CHUNK_ANALYSES: &str = "Contract analysis failed: No successful chunk analyses.";
pub const NO_CHUNK_EVALUATIONS: &str =
    "Contract evaluation failed: No successful chunk evaluations.";

/// Successful replies and failures, both in chunk order.
struct Split<'a> {
    successes: Vec<(usize, &'a str)>,
    failures: Vec<(usize, &'a AiError)>,
    total: usize,
}

impl<'a> Split<'a> {
    fn new(outcomes: &'a [ChunkOutcome]) -> Self {
        let mut ordered: Vec<&ChunkOutcome> = outcomes.iter().collect();
        ordered.sort_by_key(|o| o.index());

        let mut successes = Vec::new();
        let mut failures = Vec::new();
        for outcome in ordered {
            match outcome {
                ChunkOutcome::Success { index, reply } => successes.push((*index, reply.as_str())),
                ChunkOutcome::Failure { index, error } => failures.push((*index, error)),
            }
        }

        Self {
            successes,
            failures,
            total: outcomes.len(),
        }
    }

    fn partial_failure(&self) -> Option<AiError> {
        (!self.failures.is_empty()).then(|| AiError::PartialChunkFailure {
            failed: self.failures.len(),
            total: self.total,
        })
    }

    /// "Section 2: timeout; Section 4: API error 503: ..."
    fn failure_reasons(&self) -> String {
        self.failures
            .iter()
            .map(|(index, error)| format!("Section {}: {}", index + 1, error))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn sections(&self, heading: &str) -> String {
        self.successes
            .iter()
            .map(|(index, reply)| format!("Section {} {}:\n{}", index + 1, heading, reply.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Combine chunk analyses into labelled sections. Failed chunks are dropped
/// from the text and logged.
pub fn merge_analysis(outcomes: &[ChunkOutcome], models: &ModelCatalog) -> AnalysisResult {
    let split = Split::new(outcomes);

    if split.successes.is_empty() {
        warn!(
            chunks = split.total,
            reasons = %split.failure_reasons(),
            "every chunk analysis failed"
        );
        return AnalysisResult {
            analysis: NO_CHUNK_ANALYSES.to_string(),
            model_used: FALLBACK_MODEL.to_string(),
        };
    }

    let model_used = match split.partial_failure() {
        Some(partial) => {
            warn!(
                error = %partial,
                reasons = %split.failure_reasons(),
                "dropping failed sections from analysis"
            );
            models.partial_label()
        }
        None => models.chunked_label(),
    };

    AnalysisResult {
        analysis: split.sections("Analysis"),
        model_used,
    }
}

/// Combine chunk verdicts. One "not approved" section rejects the contract.
pub fn merge_evaluation(outcomes: &[ChunkOutcome], models: &ModelCatalog) -> EvaluationResult {
    let split = Split::new(outcomes);

    if split.successes.is_empty() {
        warn!(
            chunks = split.total,
            reasons = %split.failure_reasons(),
            "every chunk evaluation failed"
        );
        return EvaluationResult {
            approved: false,
            reasoning: NO_CHUNK_EVALUATIONS.to_string(),
            model_used: FALLBACK_MODEL.to_string(),
        };
    }

    let approved = split.successes.iter().all(|(_, reply)| is_approved(reply));
    let mut reasoning = split.sections("Evaluation");

    let model_used = match split.partial_failure() {
        Some(partial) => {
            warn!(error = %partial, "some sections could not be evaluated");
            reasoning.push_str(&format!(
                "\n\nWarning: {} ({})",
                partial,
                split.failure_reasons()
            ));
            models.partial_label()
        }
        None => models.chunked_label(),
    };

    EvaluationResult {
        approved,
        reasoning,
        model_used,
    }
}

/// Concatenate clause arrays from every chunk. Chunks that failed or did not
/// parse add nothing and are reported in `error`.
pub fn merge_clauses(outcomes: &[ChunkOutcome], models: &ModelCatalog) -> ClauseExtraction {
    let split = Split::new(outcomes);
    let mut clauses = Vec::new();
    let mut errors: Vec<(usize, String)> = split
        .failures
        .iter()
        .map(|(index, error)| (*index, error.to_string()))
        .collect();

    for (index, reply) in &split.successes {
        match parse_clause_reply(reply) {
            Ok(parsed) => clauses.extend(parsed),
            Err(e) => {
                warn!(chunk = *index, error = %e, "chunk clause reply did not parse");
                errors.push((*index, e.to_string()));
            }
        }
    }
    errors.sort_by_key(|(index, _)| *index);

    let model_used = if split.successes.is_empty() {
        FALLBACK_MODEL.to_string()
    } else {
        models.chat_model.clone()
    };

    let error = (!errors.is_empty()).then(|| {
        errors
            .iter()
            .map(|(index, e)| format!("Chunk {}: {}", index + 1, e))
            .collect::<Vec<_>>()
            .join("; ")
    });

    ClauseExtraction::new(clauses, model_used, error)
}
