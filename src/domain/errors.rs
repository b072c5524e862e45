//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

/// Failure of one remote analysis call, or of merging chunk results.
///
/// The facade never surfaces these to its caller; they are converted into
/// degraded result envelopes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AiError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection error: {0}")]
    Connection(String),

    /// Non-2xx status after retries were exhausted.
    #[error("API error {status}: {body}")]
    Http { status: u16, body: String },

    /// Reply did not carry `choices[0].message.content`.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("invalid JSON in reply: {0}")]
    JsonParse(String),

    #[error("{failed} of {total} chunks failed")]
    PartialChunkFailure { failed: usize, total: usize },

    /// Worker task died before producing an outcome.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AiError {
    /// Timeout and connection failures: the service could not be reached at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Connection(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk size must be greater than zero")]
    InvalidSize,
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("AI analysis failed: {0}")]
    Ai(#[from] AiError),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(AiError::Timeout("t".into()).is_transport());
        assert!(AiError::Connection("c".into()).is_transport());
        assert!(
            !AiError::Http {
                status: 500,
                body: String::new()
            }
            .is_transport()
        );
        assert!(!AiError::MalformedResponse("m".into()).is_transport());
    }

    #[test]
    fn test_domain_error_wraps_ai_error() {
        let err: DomainError = AiError::Timeout("60s".into()).into();
        assert_eq!(err.to_string(), "AI analysis failed: request timed out: 60s");
    }
}
