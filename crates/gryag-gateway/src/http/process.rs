//! POST /api/v1/process — the per-message entry point.
//!
//! Admission has already parsed the payload, applied every gate, and taken
//! the chat lock; this handler only binds the request id and hands off to
//! the orchestrator. Failures after admission still answer 200 with a
//! localized reply, so the frontend can always forward something coherent.

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use tracing::Instrument;

use gryag_agent::RequestContext;
use gryag_core::types::{ProcessRequest, ProcessResponse};

use crate::admission::RequestId;
use crate::app::AppState;

pub async fn process_handler(
    State(state): State<Arc<AppState>>,
    Extension(payload): Extension<ProcessRequest>,
    Extension(RequestId(request_id)): Extension<RequestId>,
) -> Json<ProcessResponse> {
    let span = tracing::info_span!("process", request_id = %request_id, chat_id = payload.chat_id);
    let mut rctx = RequestContext::new(
        request_id.as_str(),
        payload.chat_id,
        payload.user_id,
        None,
        &payload.text,
    );
    let response = state
        .orchestrator
        .process(&payload, &mut rctx)
        .instrument(span)
        .await;
    Json(response)
}
