//! Admission: the gate between the HTTP surface and the orchestrator.
//!
//! The payload is parsed exactly once here and stashed in request
//! extensions for the handler. Checks run in order: chat whitelist →
//! global-per-chat rate limit → per-user rate limit → per-chat processing
//! lock. Every denial writes an audit message row (throttled=true) and
//! answers 204 — strict silence, the user is never told they were
//! throttled. The lock is released after the handler on every exit path.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, warn};
use uuid::Uuid;

use gryag_cache::LockToken;
use gryag_core::types::ProcessRequest;
use gryag_store::NewMessage;

use crate::app::AppState;

/// Fixed-window length for both rate tiers.
const RATE_WINDOW: Duration = Duration::from_secs(60);
/// Processing-lock TTL — the backstop against a wedged orchestrator.
const LOCK_TTL: Duration = Duration::from_secs(120);
/// Request bodies above this are rejected outright.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Request id propagated from the `X-Request-ID` header (or generated).
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[derive(Debug, PartialEq, Eq)]
pub enum Denial {
    NotWhitelisted,
    ChatRateLimited,
    UserRateLimited,
    Locked,
}

impl Denial {
    fn as_str(&self) -> &'static str {
        match self {
            Denial::NotWhitelisted => "not_whitelisted",
            Denial::ChatRateLimited => "chat_rate_limited",
            Denial::UserRateLimited => "user_rate_limited",
            Denial::Locked => "chat_locked",
        }
    }
}

pub enum Decision {
    Proceed(Option<LockToken>),
    Deny(Denial),
}

/// Ordered admission checks. Pure with respect to the HTTP layer so tests
/// drive it directly.
pub fn check_admission(state: &AppState, payload: &ProcessRequest) -> Decision {
    if let Some(allowed) = &state.config.allowed_chat_ids {
        if !allowed.contains(&payload.chat_id) {
            return Decision::Deny(Denial::NotWhitelisted);
        }
    }

    let chat_key = format!("rl:chat:{}", payload.chat_id);
    if !state
        .cache
        .check_rate_limit(
            &chat_key,
            state.config.rate_limit_global_per_minute,
            RATE_WINDOW,
        )
        .allowed
    {
        return Decision::Deny(Denial::ChatRateLimited);
    }

    if let Some(user_id) = payload.user_id {
        let user_key = format!("rl:user:{}:{}", payload.chat_id, user_id);
        if !state
            .cache
            .check_rate_limit(
                &user_key,
                state.config.rate_limit_user_per_minute,
                RATE_WINDOW,
            )
            .allowed
        {
            return Decision::Deny(Denial::UserRateLimited);
        }
    }

    match state.cache.acquire_lock(payload.chat_id, LOCK_TTL) {
        Some(token) => Decision::Proceed(Some(token)),
        None => Decision::Deny(Denial::Locked),
    }
}

/// Persist the audit row for a silently dropped request, so later context
/// builds still see it as history.
pub fn audit_denial(state: &AppState, payload: &ProcessRequest, request_id: &str) {
    let row = NewMessage {
        chat_id: payload.chat_id,
        user_id: payload.user_id,
        display_name: non_empty(&payload.first_name),
        username: non_empty(&payload.username),
        text: non_empty(&payload.text),
        external_message_id: (payload.message_id != 0).then_some(payload.message_id),
        media_type: payload.media_type.clone(),
        file_id: non_empty(&payload.file_id),
        is_bot: false,
        request_id: Some(request_id.to_string()),
        throttled: true,
        reply_to_external_id: payload.reply_to_message_id,
    };
    if let Err(e) = state.store.insert_message(&row) {
        warn!(%request_id, error = %e, "throttled audit row not persisted");
    }
}

pub async fn admission_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let (parts, body) = req.into_parts();

    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return invalid_payload(),
    };
    let payload: ProcessRequest = match serde_json::from_slice(&bytes) {
        Ok(payload) => payload,
        Err(_) => return invalid_payload(),
    };

    let request_id = parts
        .headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    match check_admission(&state, &payload) {
        Decision::Deny(denial) => {
            info!(
                request_id = %request_id,
                chat_id = payload.chat_id,
                user_id = ?payload.user_id,
                reason = denial.as_str(),
                "request dropped"
            );
            audit_denial(&state, &payload, &request_id);
            StatusCode::NO_CONTENT.into_response()
        }
        Decision::Proceed(lock) => {
            let chat_id = payload.chat_id;
            let mut req = Request::from_parts(parts, Body::empty());
            req.extensions_mut().insert(payload);
            req.extensions_mut().insert(RequestId(request_id));

            let response = next.run(req).await;

            if let Some(token) = lock {
                state.cache.release_lock(chat_id, &token);
            }
            response
        }
    }
}

fn invalid_payload() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": "invalid payload" })),
    )
        .into_response()
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
