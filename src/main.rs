//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here.

use contract_ai::adapters::ai::{DeepSeekAdapter, MockAiAdapter, RetryPolicy};
use contract_ai::adapters::persistence::{InMemoryResultCache, MarkdownReportWriter};
use contract_ai::adapters::ui::tui::TuiInputPort;
use contract_ai::ports::{AiPort, InputPort, ReportPort};
use contract_ai::shared::config::AppConfig;
use contract_ai::shared::metrics::MetricsRegistry;
use contract_ai::usecases::AnalysisService;
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    contract_ai::adapters::ui::init_ui();

    let cfg = AppConfig::load().map_err(|e| anyhow::anyhow!("load configuration: {}", e))?;
    cfg.validate().map_err(|e| anyhow::anyhow!("{}", e))?;
    let settings = cfg.analysis_settings();

    // --- AI adapter (live when a key is present, mock otherwise) ---
    let ai_adapter: Arc<dyn AiPort> = match cfg.api_key() {
        Some(api_key) => {
            let retry = RetryPolicy {
                max_attempts: cfg.max_attempts_or_default(),
                ..RetryPolicy::default()
            };
            info!(
                url = %cfg.api_url_or_default(),
                reasoning_model = %settings.models.reasoning_model,
                chat_model = %settings.models.chat_model,
                max_attempts = retry.max_attempts,
                "AI analysis enabled with DeepSeek adapter"
            );
            Arc::new(DeepSeekAdapter::new(cfg.api_url_or_default(), api_key).with_retry(retry))
        }
        None => {
            warn!("CONTRACT_AI_API_KEY / DEEPSEEK_API_KEY not set, using mock AI adapter");
            Arc::new(MockAiAdapter::new())
        }
    };

    info!(
        chunk_size = settings.chunk_size,
        chunk_threshold = settings.chunk_threshold,
        max_concurrency = settings.max_concurrency,
        "chunking configured"
    );

    // --- Services ---
    let metrics = Arc::new(MetricsRegistry::new());
    let mut service = AnalysisService::new(ai_adapter, settings, Arc::clone(&metrics));
    match cfg.cache_ttl() {
        Some(ttl) => {
            info!(ttl_secs = ttl.as_secs(), "result cache enabled");
            service = service.with_cache(Arc::new(InMemoryResultCache::new(ttl)));
        }
        None => info!("result cache disabled"),
    }
    let service = Arc::new(service);

    let reports_dir = PathBuf::from(cfg.reports_dir_or_default());
    info!(path = %reports_dir.display(), "reports directory");
    let reports: Arc<dyn ReportPort> = Arc::new(MarkdownReportWriter::new(reports_dir));

    let input_port: Arc<dyn InputPort> =
        Arc::new(TuiInputPort::new(Arc::clone(&service), reports));

    // --- Run (main menu -> analyze / evaluate / extract / review) ---
    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let snapshot = metrics.snapshot();
    info!(
        requests = snapshot.request_count,
        degraded = snapshot.degraded_count,
        remote_calls = snapshot.remote_calls,
        cache_hits = snapshot.cache_hits,
        average_latency_secs = snapshot.average_latency,
        "session finished"
    );

    Ok(())
}
