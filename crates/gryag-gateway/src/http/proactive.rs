//! GET /api/v1/proactive — the frontend's delivery poll.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::app::AppState;

/// How long one poll blocks waiting for a queued item.
const POLL_BLOCK: Duration = Duration::from_secs(5);

pub async fn proactive_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.cache.pop_proactive(POLL_BLOCK).await {
        Some((chat_id, reply)) => {
            Json(json!({ "chat_id": chat_id, "reply": reply })).into_response()
        }
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
