//! Service entry point: configuration, storage, the Gemini client, tool
//! registration, background schedulers, and the HTTP listener. Any failed
//! startup step exits non-zero.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info, warn};

use gryag_agent::media::MediaCache;
use gryag_agent::tools::{
    currency::CurrencyTool, facts::ForgetFactTool, facts::ListFactsTool, facts::RememberFactTool,
    image::EditImageTool, image::GenerateImageTool, sandbox::SandboxTool,
    search_messages::SearchMessagesTool, weather::WeatherTool, web_search::WebSearchTool,
    ToolRegistry,
};
use gryag_agent::{GeminiClient, Orchestrator, Persona};
use gryag_cache::Cache;
use gryag_core::config::Config;
use gryag_core::i18n::Localizer;
use gryag_scheduler::{ActiveHours, ProactiveScheduler, SummarizationScheduler};
use gryag_store::Store;

mod admission;
mod app;
mod http;
mod proc;
#[cfg(test)]
mod testutil;

/// Drain window for in-flight requests on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Cadence of the retention/media maintenance task.
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(24 * 3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gryag_gateway=info,gryag_agent=info,tower_http=warn".into()),
        )
        .init();

    let config = Config::load().context("configuration")?;

    let localizer = Arc::new(
        Localizer::load(&config.locale_dir, &config.default_lang).context("locale bundle")?,
    );

    let store = Arc::new(Store::open(&config.db_path).context("store open/migrate")?);
    let cache = Arc::new(Cache::new());

    let gemini = Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_image_model.clone(),
    ));

    let persona = Arc::new(Persona::load(&config.persona_file).context("persona")?);

    let media = MediaCache::new(config.media_cache_dir.clone(), config.media_cache_ttl_hours);
    media.ensure_dir().context("media cache dir")?;

    let registry = Arc::new(build_registry(&config, &store, &gemini, &media));

    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        gemini.clone(),
        registry,
        persona.clone(),
        localizer,
        media,
        config.immediate_context_size,
        config.enable_voice_stt,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(wait_for_signal(shutdown_tx));

    if config.enable_proactive_messaging {
        let scheduler = ProactiveScheduler::new(
            orchestrator.clone(),
            store.clone(),
            cache.clone(),
            ActiveHours::from_pair(config.proactive_active_hours),
            Duration::from_secs(config.proactive_interval_minutes * 60),
        );
        tokio::spawn(scheduler.run(shutdown_rx.clone()));
    }

    if config.enable_summarization {
        let scheduler = SummarizationScheduler::new(
            store.clone(),
            gemini.clone(),
            config.summary_run_hour,
            config.summary_7day_interval_days,
            config.summary_30day_interval_days,
        );
        tokio::spawn(scheduler.run(shutdown_rx.clone()));
    }

    tokio::spawn(run_maintenance(
        store.clone(),
        config.message_retention_days,
        shutdown_rx.clone(),
    ));

    let addr: SocketAddr = format!("{}:{}", config.bind_host, config.bind_port)
        .parse()
        .context("bind address")?;
    let state = Arc::new(app::AppState::new(config, store, cache, orchestrator, persona));
    let router = app::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("tcp bind")?;
    info!(%addr, "gryag gateway listening");

    let mut serve_rx = shutdown_rx.clone();
    let server = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = serve_rx.changed().await;
        });
    let server_task = tokio::spawn(server.into_future());

    let mut main_rx = shutdown_rx;
    let _ = main_rx.changed().await;
    info!("shutdown signal received, draining");

    match tokio::time::timeout(SHUTDOWN_GRACE, server_task).await {
        Ok(joined) => joined.context("server task")?.context("server")?,
        Err(_) => warn!("drain window elapsed with requests still in flight"),
    }

    info!("bye");
    Ok(())
}

/// Build the tool catalogue according to the feature toggles.
fn build_registry(
    config: &Config,
    store: &Arc<Store>,
    gemini: &Arc<GeminiClient>,
    media: &MediaCache,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(RememberFactTool::new(store.clone())));
    registry.register(Box::new(ListFactsTool::new(store.clone())));
    registry.register(Box::new(ForgetFactTool::new(store.clone())));
    registry.register(Box::new(SearchMessagesTool::new(store.clone())));
    registry.register(Box::new(WeatherTool::new()));
    registry.register(Box::new(CurrencyTool::new()));

    if config.enable_web_search {
        registry.register(Box::new(WebSearchTool::new(gemini.clone())));
    }
    if config.enable_sandbox {
        match &config.sandbox_url {
            Some(url) => registry.register(Box::new(SandboxTool::new(url.clone()))),
            None => warn!("ENABLE_SANDBOX set without SANDBOX_URL — sandbox tool disabled"),
        }
    }
    if config.enable_image_generation {
        registry.register(Box::new(GenerateImageTool::new(gemini.clone())));
        registry.register(Box::new(EditImageTool::new(
            gemini.clone(),
            store.clone(),
            media.clone(),
        )));
    }
    registry
}

/// Flip the shutdown watch on SIGINT or SIGTERM.
async fn wait_for_signal(tx: watch::Sender<bool>) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received"),
        _ = terminate => info!("SIGTERM received"),
    }
    let _ = tx.send(true);
}

/// Daily housekeeping: message retention pruning and expired media cleanup
/// (files first, rows second).
async fn run_maintenance(
    store: Arc<Store>,
    retention_days: i64,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(MAINTENANCE_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match store.prune_old_messages(retention_days) {
                    Ok(0) => {}
                    Ok(n) => info!(deleted = n, "retention prune complete"),
                    Err(e) => warn!(error = %e, "retention prune failed"),
                }
                match store.get_expired_media() {
                    Ok(expired) => {
                        for entry in expired {
                            if let Err(e) = std::fs::remove_file(&entry.file_path) {
                                if e.kind() != std::io::ErrorKind::NotFound {
                                    warn!(path = %entry.file_path, error = %e, "media file not removed");
                                    continue;
                                }
                            }
                            if let Err(e) = store.delete_media_cache(entry.id) {
                                warn!(media_id = %entry.media_id, error = %e, "media row not removed");
                            }
                        }
                    }
                    Err(e) => warn!(error = %e, "expired media lookup failed"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
