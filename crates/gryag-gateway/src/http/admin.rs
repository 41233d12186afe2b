//! Admin endpoints: runtime stats and persona hot-reload.
//!
//! Authorization is a static admin-id list from configuration; anything
//! else answers 403.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::app::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminRequest {
    pub user_id: i64,
}

fn unauthorized() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": "unauthorized" })),
    )
        .into_response()
}

/// POST /api/v1/admin/stats
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdminRequest>,
) -> Response {
    if !state.config.is_admin(req.user_id) {
        return unauthorized();
    }

    let proc = crate::proc::read_self_stats();
    Json(json!({
        "status": "ok",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "memory_rss_kb": proc.rss_kb,
        "memory_vsize_kb": proc.vsize_kb,
        "cpu_seconds": proc.cpu_seconds,
        "threads": proc.threads,
        "model": state.config.gemini_model,
        "default_lang": state.config.default_lang,
    }))
    .into_response()
}

/// POST /api/v1/admin/reload_persona
pub async fn reload_persona_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdminRequest>,
) -> Response {
    if !state.config.is_admin(req.user_id) {
        return unauthorized();
    }

    match state.persona.reload() {
        Ok(()) => {
            info!(file = %state.persona.path(), "persona reloaded");
            Json(json!({
                "status": "ok",
                "message": "persona reloaded",
                "file": state.persona.path(),
            }))
            .into_response()
        }
        Err(e) => {
            warn!(error = %e, "persona reload failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_state;

    #[tokio::test]
    async fn stats_rejects_non_admin() {
        let state = Arc::new(test_state(|_| {}));
        let resp = stats_handler(State(state), Json(AdminRequest { user_id: 1 })).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn stats_allows_configured_admin() {
        let state = Arc::new(test_state(|_| {}));
        let resp = stats_handler(State(state), Json(AdminRequest { user_id: 900 })).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn reload_persona_round_trip() {
        let state = Arc::new(test_state(|_| {}));
        let resp =
            reload_persona_handler(State(state), Json(AdminRequest { user_id: 900 })).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn reload_persona_rejects_non_admin() {
        let state = Arc::new(test_state(|_| {}));
        let resp = reload_persona_handler(State(state), Json(AdminRequest { user_id: 7 })).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
