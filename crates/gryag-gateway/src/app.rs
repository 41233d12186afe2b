use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use gryag_agent::{Orchestrator, Persona};
use gryag_cache::Cache;
use gryag_core::config::Config;
use gryag_store::Store;

/// Central shared state — passed as `Arc<AppState>` to all handlers.
pub struct AppState {
    pub config: Config,
    pub store: Arc<Store>,
    pub cache: Arc<Cache>,
    pub orchestrator: Arc<Orchestrator>,
    pub persona: Arc<Persona>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<Store>,
        cache: Arc<Cache>,
        orchestrator: Arc<Orchestrator>,
        persona: Arc<Persona>,
    ) -> Self {
        Self {
            config,
            store,
            cache,
            orchestrator,
            persona,
            started_at: Instant::now(),
        }
    }
}

/// Assemble the full router. The proactive poll route only exists when the
/// proactive scheduler is enabled.
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route(
            "/api/v1/process",
            post(crate::http::process::process_handler).layer(middleware::from_fn_with_state(
                state.clone(),
                crate::admission::admission_middleware,
            )),
        )
        .route("/api/v1/admin/stats", post(crate::http::admin::stats_handler))
        .route(
            "/api/v1/admin/reload_persona",
            post(crate::http::admin::reload_persona_handler),
        );

    if state.config.enable_proactive_messaging {
        router = router.route(
            "/api/v1/proactive",
            get(crate::http::proactive::proactive_handler),
        );
    }

    router
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::timeout::TimeoutLayer::new(
            std::time::Duration::from_secs(120),
        ))
}
