//! Application configuration. API credentials, models, chunking and timeouts.

use crate::domain::{DomainError, ModelKind, OperationKind};
use crate::usecases::chunker::{DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_THRESHOLD};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.deepseek.com/v1/chat/completions";
pub const DEFAULT_REASONING_MODEL: &str = "deepseek-reasoner";
pub const DEFAULT_CHAT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_REASONING_LABEL: &str = "DeepSeek Reasoning Model";

/// Default size of the chunk worker pool.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Default cache lifetime for analysis results (2 hours).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 2 * 60 * 60;

/// Which remote model serves which operation, and how results are labelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    pub reasoning_model: String,
    pub chat_model: String,
    /// Human-readable name of the reasoning model, used in `model_used`.
    pub reasoning_label: String,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            reasoning_model: DEFAULT_REASONING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            reasoning_label: DEFAULT_REASONING_LABEL.to_string(),
        }
    }
}

impl ModelCatalog {
    pub fn model_id(&self, kind: ModelKind) -> &str {
        match kind {
            ModelKind::Reasoning => &self.reasoning_model,
            ModelKind::Chat => &self.chat_model,
        }
    }

    pub fn model_for(&self, operation: OperationKind) -> &str {
        self.model_id(operation.model_kind())
    }

    /// `model_used` for a single-shot reasoning result.
    pub fn live_label(&self) -> String {
        format!("{} (Live)", self.reasoning_label)
    }

    /// `model_used` when every chunk succeeded.
    pub fn chunked_label(&self) -> String {
        format!("{} (Chunked)", self.reasoning_label)
    }

    /// `model_used` when some chunks failed.
    pub fn partial_label(&self) -> String {
        format!("{} (Partial)", self.reasoning_label)
    }
}

/// Everything the analysis facade needs to decide and dispatch.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub models: ModelCatalog,
    pub chunk_size: usize,
    pub chunk_threshold: usize,
    pub max_concurrency: usize,
    pub analyze_timeout: Duration,
    pub evaluate_timeout: Duration,
    pub extract_timeout: Duration,
    /// Timeout of one chunk call on the chunked path.
    pub chunk_timeout: Duration,
    pub connection_test_timeout: Duration,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            models: ModelCatalog::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_threshold: DEFAULT_CHUNK_THRESHOLD,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            analyze_timeout: Duration::from_secs(120),
            evaluate_timeout: Duration::from_secs(120),
            extract_timeout: Duration::from_secs(60),
            chunk_timeout: Duration::from_secs(60),
            connection_test_timeout: Duration::from_secs(10),
        }
    }
}

impl AnalysisSettings {
    /// Timeout of a direct (non-chunked) call.
    pub fn direct_timeout(&self, operation: OperationKind) -> Duration {
        match operation {
            OperationKind::Analyze => self.analyze_timeout,
            OperationKind::Evaluate => self.evaluate_timeout,
            OperationKind::ExtractClauses => self.extract_timeout,
            OperationKind::ConnectionTest => self.connection_test_timeout,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Bearer token. Read from CONTRACT_AI_API_KEY, falling back to DEEPSEEK_API_KEY.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Chat completions endpoint. Read from CONTRACT_AI_API_URL.
    #[serde(default)]
    pub api_url: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Models
    // ─────────────────────────────────────────────────────────────────────────
    /// Model for analysis and evaluation. Read from CONTRACT_AI_REASONING_MODEL.
    #[serde(default)]
    pub reasoning_model: Option<String>,

    /// Faster model for clause extraction. Read from CONTRACT_AI_CHAT_MODEL.
    #[serde(default)]
    pub chat_model: Option<String>,

    /// Display name of the reasoning model. Read from CONTRACT_AI_REASONING_LABEL.
    #[serde(default)]
    pub reasoning_label: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Chunking & concurrency
    // ─────────────────────────────────────────────────────────────────────────
    #[serde(default)]
    pub chunk_size: Option<usize>,

    /// Texts longer than this many chars are chunked.
    #[serde(default)]
    pub chunk_threshold: Option<usize>,

    /// Worker pool size for chunk dispatch.
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// Total attempts per remote call on transient HTTP statuses.
    #[serde(default)]
    pub max_attempts: Option<u32>,

    // ─────────────────────────────────────────────────────────────────────────
    // Timeouts (seconds)
    // ─────────────────────────────────────────────────────────────────────────
    #[serde(default)]
    pub analyze_timeout_secs: Option<u64>,

    #[serde(default)]
    pub evaluate_timeout_secs: Option<u64>,

    #[serde(default)]
    pub extract_timeout_secs: Option<u64>,

    #[serde(default)]
    pub chunk_timeout_secs: Option<u64>,

    #[serde(default)]
    pub connection_test_timeout_secs: Option<u64>,

    // ─────────────────────────────────────────────────────────────────────────
    // Cache & reports
    // ─────────────────────────────────────────────────────────────────────────
    /// Result cache lifetime; 0 disables the cache. Read from CONTRACT_AI_CACHE_TTL_SECS.
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,

    /// Where Markdown reports are written. Read from CONTRACT_AI_REPORTS_DIR.
    #[serde(default)]
    pub reports_dir: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("CONTRACT_AI").try_parsing(true));
        if let Ok(path) = std::env::var("CONTRACT_AI_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    /// Reject values the core cannot work with.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.chunk_size == Some(0) {
            return Err(DomainError::Config("chunk_size must be > 0".into()));
        }
        if self.max_concurrency == Some(0) {
            return Err(DomainError::Config("max_concurrency must be > 0".into()));
        }
        if self.max_attempts == Some(0) {
            return Err(DomainError::Config("max_attempts must be > 0".into()));
        }
        Ok(())
    }

    /// Returns the API key if configured. Empty values count as unset.
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("DEEPSEEK_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }

    /// Returns the API URL. Defaults to the DeepSeek chat completions endpoint.
    pub fn api_url_or_default(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Returns total attempts per remote call. Defaults to 3.
    pub fn max_attempts_or_default(&self) -> u32 {
        self.max_attempts.unwrap_or(3)
    }

    /// Returns the cache TTL, or None when caching is disabled.
    pub fn cache_ttl(&self) -> Option<Duration> {
        match self.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn reports_dir_or_default(&self) -> String {
        self.reports_dir
            .clone()
            .unwrap_or_else(|| "./reports".to_string())
    }

    /// Build the facade settings, filling gaps with defaults.
    pub fn analysis_settings(&self) -> AnalysisSettings {
        let defaults = AnalysisSettings::default();
        let secs = |v: Option<u64>, d: Duration| v.map(Duration::from_secs).unwrap_or(d);

        AnalysisSettings {
            models: ModelCatalog {
                reasoning_model: self
                    .reasoning_model
                    .clone()
                    .unwrap_or(defaults.models.reasoning_model),
                chat_model: self.chat_model.clone().unwrap_or(defaults.models.chat_model),
                reasoning_label: self
                    .reasoning_label
                    .clone()
                    .unwrap_or(defaults.models.reasoning_label),
            },
            chunk_size: self.chunk_size.unwrap_or(defaults.chunk_size),
            chunk_threshold: self.chunk_threshold.unwrap_or(defaults.chunk_threshold),
            max_concurrency: self.max_concurrency.unwrap_or(defaults.max_concurrency),
            analyze_timeout: secs(self.analyze_timeout_secs, defaults.analyze_timeout),
            evaluate_timeout: secs(self.evaluate_timeout_secs, defaults.evaluate_timeout),
            extract_timeout: secs(self.extract_timeout_secs, defaults.extract_timeout),
            chunk_timeout: secs(self.chunk_timeout_secs, defaults.chunk_timeout),
            connection_test_timeout: secs(
                self.connection_test_timeout_secs,
                defaults.connection_test_timeout,
            ),
        }
    }
}
