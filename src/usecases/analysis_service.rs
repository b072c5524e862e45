//! Analysis service. Facade over the AI-analysis pipeline.
//!
//! Coordinates chunking, concurrent dispatch, aggregation, result caching
//! and metrics. Every public operation returns a result envelope; remote
//! failures become degraded envelopes (`model_used = "Fallback Response"`
//! or an `error` message), never errors or panics.

use crate::domain::{
    AiError, AnalysisResult, ChunkOutcome, ClauseExtraction, ContractReview, EvaluationResult,
    FALLBACK_MODEL, OperationKind, PromptRequest, is_approved,
};
use crate::ports::{AiPort, CachedResult, ResultCache};
use crate::shared::config::{AnalysisSettings, ModelCatalog};
use crate::shared::metrics::MetricsRegistry;
use crate::usecases::aggregator::{merge_analysis, merge_clauses, merge_evaluation};
use crate::usecases::chunker::{chunk_text, needs_chunking};
use crate::usecases::clause_parser::parse_clause_reply;
use crate::usecases::clause_recovery::recover_clauses;
use crate::usecases::orchestrator::ChunkOrchestrator;
use crate::usecases::prompts::system_prompt;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Hex SHA-256 of the contract text; the cache key for duplicate detection.
pub fn text_digest(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Common handling of the three result envelopes (cache, metrics).
trait Envelope: Clone + Sized {
    fn into_cached(self) -> CachedResult;
    fn from_cached(cached: CachedResult) -> Option<Self>;
    /// The remote service could not be used at all.
    fn is_fallback(&self) -> bool;
    /// Fully successful; safe to serve again for the same text.
    fn is_complete(&self, models: &ModelCatalog) -> bool;
}

impl Envelope for AnalysisResult {
    fn into_cached(self) -> CachedResult {
        CachedResult::Analysis(self)
    }

    fn from_cached(cached: CachedResult) -> Option<Self> {
        match cached {
            CachedResult::Analysis(r) => Some(r),
            _ => None,
        }
    }

    fn is_fallback(&self) -> bool {
        self.model_used == FALLBACK_MODEL
    }

    fn is_complete(&self, models: &ModelCatalog) -> bool {
        !self.is_fallback() && self.model_used != models.partial_label()
    }
}

impl Envelope for EvaluationResult {
    fn into_cached(self) -> CachedResult {
        CachedResult::Evaluation(self)
    }

    fn from_cached(cached: CachedResult) -> Option<Self> {
        match cached {
            CachedResult::Evaluation(r) => Some(r),
            _ => None,
        }
    }

    fn is_fallback(&self) -> bool {
        self.model_used == FALLBACK_MODEL
    }

    fn is_complete(&self, models: &ModelCatalog) -> bool {
        !self.is_fallback() && self.model_used != models.partial_label()
    }
}

impl Envelope for ClauseExtraction {
    fn into_cached(self) -> CachedResult {
        CachedResult::Clauses(self)
    }

    fn from_cached(cached: CachedResult) -> Option<Self> {
        match cached {
            CachedResult::Clauses(r) => Some(r),
            _ => None,
        }
    }

    fn is_fallback(&self) -> bool {
        self.model_used == FALLBACK_MODEL
    }

    fn is_complete(&self, _models: &ModelCatalog) -> bool {
        !self.is_fallback() && self.error.is_none()
    }
}

/// Service for AI-powered contract analysis.
///
/// Each operation follows the same flow:
/// 1. Serve from cache when the same text was already processed
/// 2. Short text: one remote call. Long text: chunk and fan out
/// 3. Merge chunk results, or degrade on failure
/// 4. Record metrics and cache complete results
pub struct AnalysisService {
    ai: Arc<dyn AiPort>,
    orchestrator: ChunkOrchestrator,
    settings: AnalysisSettings,
    metrics: Arc<MetricsRegistry>,
    cache: Option<Arc<dyn ResultCache>>,
}

impl AnalysisService {
    /// Create a new analysis service.
    ///
    /// # Arguments
    /// * `ai` - AI port implementation (DeepSeek, Mock, etc.)
    /// * `settings` - Models, chunking limits and timeouts
    /// * `metrics` - Shared registry that records every facade call
    pub fn new(
        ai: Arc<dyn AiPort>,
        settings: AnalysisSettings,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            orchestrator: ChunkOrchestrator::new(Arc::clone(&ai), settings.max_concurrency),
            ai,
            settings,
            metrics,
            cache: None,
        }
    }

    /// Serve repeated texts from `cache`.
    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Identify clauses, risks and obligations, and judge legal soundness.
    pub async fn analyze_contract(&self, text: &str) -> AnalysisResult {
        let operation = OperationKind::Analyze;
        let started = Instant::now();
        let digest = self.digest_for(text);
        if let Some(hit) = self.lookup(operation, digest.as_deref(), started).await {
            return hit;
        }

        let result = if self.is_chunked(text) {
            let outcomes = self.dispatch_chunks(operation, text).await;
            merge_analysis(&outcomes, &self.settings.models)
        } else {
            self.analyze_direct(text).await
        };

        self.finish(operation, digest.as_deref(), started, result).await
    }

    /// Decide whether the contract should be approved.
    pub async fn evaluate_contract(&self, text: &str) -> EvaluationResult {
        let operation = OperationKind::Evaluate;
        let started = Instant::now();
        let digest = self.digest_for(text);
        if let Some(hit) = self.lookup(operation, digest.as_deref(), started).await {
            return hit;
        }

        let result = if self.is_chunked(text) {
            let outcomes = self.dispatch_chunks(operation, text).await;
            merge_evaluation(&outcomes, &self.settings.models)
        } else {
            self.evaluate_direct(text).await
        };

        self.finish(operation, digest.as_deref(), started, result).await
    }

    /// Extract structured clauses with the chat model.
    pub async fn extract_clauses(&self, text: &str) -> ClauseExtraction {
        let operation = OperationKind::ExtractClauses;
        let started = Instant::now();
        let digest = self.digest_for(text);
        if let Some(hit) = self.lookup(operation, digest.as_deref(), started).await {
            return hit;
        }

        let result = if self.is_chunked(text) {
            let outcomes = self.dispatch_chunks(operation, text).await;
            merge_clauses(&outcomes, &self.settings.models)
        } else {
            self.extract_direct(text).await
        };

        self.finish(operation, digest.as_deref(), started, result).await
    }

    /// Run all three operations concurrently on one text.
    pub async fn review_contract(&self, title: &str, text: &str) -> ContractReview {
        let (analysis, evaluation, clauses) = tokio::join!(
            self.analyze_contract(text),
            self.evaluate_contract(text),
            self.extract_clauses(text),
        );

        ContractReview {
            title: title.to_string(),
            analysis,
            evaluation,
            clauses,
            reviewed_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Cheap round-trip to the remote service. True when it answered at all.
    pub async fn test_api_connection(&self) -> bool {
        match self.call_direct(OperationKind::ConnectionTest, "ping").await {
            Ok(_) => {
                info!("AI API connection test succeeded");
                true
            }
            Err(e) => {
                warn!(error = %e, "AI API connection test failed");
                false
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Direct (single prompt) paths
    // ─────────────────────────────────────────────────────────────────────

    async fn analyze_direct(&self, text: &str) -> AnalysisResult {
        match self.call_direct(OperationKind::Analyze, text).await {
            Ok(reply) => AnalysisResult {
                analysis: reply,
                model_used: self.settings.models.live_label(),
            },
            Err(e) => {
                warn!(error = %e, "contract analysis degraded to fallback");
                let analysis = if e.is_transport() {
                    format!(
                        "Contract analysis failed: the AI service is temporarily unavailable ({}). Please try again later.",
                        e
                    )
                } else {
                    format!("Contract analysis failed: {}", e)
                };
                AnalysisResult {
                    analysis,
                    model_used: FALLBACK_MODEL.to_string(),
                }
            }
        }
    }

    async fn evaluate_direct(&self, text: &str) -> EvaluationResult {
        match self.call_direct(OperationKind::Evaluate, text).await {
            Ok(reply) => {
                let reasoning = reply.trim().to_string();
                EvaluationResult {
                    approved: is_approved(&reasoning),
                    reasoning,
                    model_used: self.settings.models.live_label(),
                }
            }
            Err(e) => {
                warn!(error = %e, "contract evaluation degraded to fallback");
                let reasoning = if e.is_transport() {
                    format!(
                        "Contract evaluation failed: the AI service is temporarily unavailable ({}). Please try again later.",
                        e
                    )
                } else {
                    format!("Contract evaluation failed: {}", e)
                };
                EvaluationResult {
                    approved: false,
                    reasoning,
                    model_used: FALLBACK_MODEL.to_string(),
                }
            }
        }
    }

    async fn extract_direct(&self, text: &str) -> ClauseExtraction {
        let reply = match self.call_direct(OperationKind::ExtractClauses, text).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "clause extraction degraded to fallback");
                let message = if e.is_transport() {
                    format!("AI service unavailable: {}", e)
                } else {
                    format!("AI request failed: {}", e)
                };
                return ClauseExtraction::fallback(message);
            }
        };

        let model_used = self.settings.models.chat_model.clone();
        let parse_error = match parse_clause_reply(&reply) {
            Ok(clauses) => return ClauseExtraction::new(clauses, model_used, None),
            Err(e) => e,
        };

        let recovered = recover_clauses(&reply);
        if recovered.is_empty() {
            warn!(error = %parse_error, "clause reply unparseable, nothing recovered");
            return ClauseExtraction::new(
                Vec::new(),
                model_used,
                Some(format!("Failed to parse AI response as JSON ({})", parse_error)),
            );
        }

        warn!(
            recovered = recovered.len(),
            error = %parse_error,
            "clause reply malformed, partially recovered"
        );
        let message = format!(
            "Partial extraction: recovered {} clause(s) from a malformed JSON response ({})",
            recovered.len(),
            parse_error
        );
        ClauseExtraction::new(recovered, model_used, Some(message))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Plumbing
    // ─────────────────────────────────────────────────────────────────────

    fn is_chunked(&self, text: &str) -> bool {
        needs_chunking(text, self.settings.chunk_threshold)
    }

    async fn call_direct(&self, operation: OperationKind, text: &str) -> Result<String, AiError> {
        let request = PromptRequest {
            operation,
            model: self.settings.models.model_for(operation).to_string(),
            system_prompt: system_prompt(operation).to_string(),
            content: text.to_string(),
            timeout: self.settings.direct_timeout(operation),
        };
        self.metrics.record_remote_calls(1);
        self.ai.complete(&request).await
    }

    async fn dispatch_chunks(&self, operation: OperationKind, text: &str) -> Vec<ChunkOutcome> {
        match chunk_text(text, self.settings.chunk_size) {
            Ok(chunks) => {
                self.metrics.record_remote_calls(chunks.len() as u64);
                self.orchestrator
                    .dispatch(
                        operation,
                        self.settings.models.model_for(operation),
                        self.settings.chunk_timeout,
                        chunks,
                    )
                    .await
            }
            Err(e) => {
                error!(operation = %operation, error = %e, "cannot chunk contract text");
                vec![ChunkOutcome::Failure {
                    index: 0,
                    error: AiError::Internal(e.to_string()),
                }]
            }
        }
    }

    fn digest_for(&self, text: &str) -> Option<String> {
        self.cache.as_ref().map(|_| text_digest(text))
    }

    async fn lookup<T: Envelope>(
        &self,
        operation: OperationKind,
        digest: Option<&str>,
        started: Instant,
    ) -> Option<T> {
        let (cache, digest) = (self.cache.as_ref()?, digest?);
        let hit = T::from_cached(cache.get(operation, digest).await?)?;
        info!(operation = %operation, "serving cached result");
        self.metrics.record_cache_hit();
        self.metrics.record_request(started.elapsed(), false);
        Some(hit)
    }

    async fn finish<T: Envelope>(
        &self,
        operation: OperationKind,
        digest: Option<&str>,
        started: Instant,
        result: T,
    ) -> T {
        if let (Some(cache), Some(digest)) = (&self.cache, digest) {
            if result.is_complete(&self.settings.models) {
                cache
                    .put(operation, digest, result.clone().into_cached())
                    .await;
            }
        }

        let degraded = result.is_fallback();
        let elapsed = started.elapsed();
        self.metrics.record_request(elapsed, degraded);
        info!(
            operation = %operation,
            degraded,
            elapsed_ms = elapsed.as_millis() as u64,
            "operation complete"
        );
        result
    }
}
