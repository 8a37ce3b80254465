//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here; analysis is delegated to AnalysisOrchestrator.

use dotenv::dotenv;
use meal_analyzer::adapters::ai::{BasicAdapter, ClaudeAdapter, GeminiAdapter, OpenAiAdapter};
use meal_analyzer::adapters::cache::{CacheLimits, ResultCache};
use meal_analyzer::adapters::network::{HttpProbeSource, ProbeSettings};
use meal_analyzer::adapters::ui::progress::SpinnerProgress;
use meal_analyzer::adapters::ui::tui::TuiInputPort;
use meal_analyzer::domain::{NetworkClassification, ProviderId};
use meal_analyzer::ports::{CachePort, CredentialProvider, InputPort, ProgressSink, ProviderClient};
use meal_analyzer::shared::AppConfig;
use meal_analyzer::usecases::{AnalysisOrchestrator, NetworkConditionMonitor};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired cache entries are swept in the background.
const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

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

    meal_analyzer::adapters::ui::init_ui();

    let cfg = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(error = %e, "config could not be loaded; using defaults");
            AppConfig::default()
        }
    };

    let configured = cfg.configured_providers();
    if configured.is_empty() {
        warn!("no provider API key configured; only the built-in estimator is available");
    } else {
        info!(providers = ?configured, "provider keys configured");
    }

    let http = reqwest::Client::builder()
        .user_agent(concat!("meal-analyzer/", env!("CARGO_PKG_VERSION")))
        .build()?;

    // --- Providers in priority order; the built-in estimator is always last ---
    let mut providers: Vec<Arc<dyn ProviderClient>> = Vec::new();
    for id in &configured {
        let client: Arc<dyn ProviderClient> = match id {
            ProviderId::OpenAi => Arc::new(OpenAiAdapter::new(http.clone())),
            ProviderId::Claude => Arc::new(ClaudeAdapter::new(http.clone())),
            ProviderId::Gemini => Arc::new(GeminiAdapter::new(http.clone())),
            ProviderId::Basic => continue,
        };
        providers.push(client);
    }
    providers.push(Arc::new(BasicAdapter::new()));

    // --- Network monitor fed by the HTTP probe ---
    let network = Arc::new(NetworkConditionMonitor::new(NetworkClassification::unknown()));
    let probe = HttpProbeSource::new(
        http.clone(),
        ProbeSettings {
            url: cfg.probe_url_or_default(),
            interval: cfg.probe_interval_or_default(),
            slow_threshold: cfg.probe_slow_threshold_or_default(),
            metered: cfg.metered_or_default(),
            transport: cfg.transport_or_default(),
        },
    );
    let _probe_task = network.subscribe(&probe);

    // --- Cache with periodic sweep ---
    let cache = Arc::new(ResultCache::new(CacheLimits {
        ttl: cfg.cache_ttl_or_default(),
        max_entries: cfg.cache_max_entries_or_default(),
        max_bytes: cfg.cache_max_bytes_or_default(),
    }));
    let sweeper = Arc::clone(&cache);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            sweeper.purge_expired().await;
        }
    });

    let mode = cfg.mode_or_default();
    let hint = cfg.provider_hint();
    let retries = cfg.network_retries_or_default();
    let credentials: Arc<dyn CredentialProvider> = Arc::new(cfg);

    let spinner = Arc::new(SpinnerProgress::new());
    let progress: Arc<dyn ProgressSink> = Arc::clone(&spinner) as Arc<dyn ProgressSink>;
    let orchestrator = Arc::new(
        AnalysisOrchestrator::new(
            providers,
            credentials,
            Arc::clone(&network),
            Arc::clone(&cache) as Arc<dyn CachePort>,
        )
        .with_progress(progress)
        .with_network_retries(retries),
    );

    let ui: Box<dyn InputPort> = Box::new(TuiInputPort::new(orchestrator, spinner, mode, hint));
    ui.run().await.map_err(|e| anyhow::anyhow!("{}", e))?;

    let stats = cache.stats().await;
    info!(
        entries = stats.entries,
        hits = stats.hits,
        misses = stats.misses,
        "session finished"
    );
    Ok(())
}
