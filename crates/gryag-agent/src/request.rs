//! Per-request value context threaded through the orchestrator and tools.
//!
//! Carries identity plus an opaque stash so tool implementations can reach
//! request-scoped data (the inbound media blob for `edit_image`) without a
//! global.

use std::collections::HashMap;

use uuid::Uuid;

/// Stash key for the raw base64 of the current message's attachment.
pub const STASH_INBOUND_MEDIA_B64: &str = "inbound_media_base64";
/// Stash key for the attachment's MIME type.
pub const STASH_INBOUND_MEDIA_MIME: &str = "inbound_media_mime";

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub chat_id: i64,
    pub user_id: Option<i64>,
    pub thread_id: Option<i64>,
    pub message_text: String,
    stash: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(
        request_id: impl Into<String>,
        chat_id: i64,
        user_id: Option<i64>,
        thread_id: Option<i64>,
        message_text: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            chat_id,
            user_id,
            thread_id,
            message_text: message_text.into(),
            stash: HashMap::new(),
        }
    }

    /// Context for an internally initiated turn (proactive, summaries) —
    /// generates its own request id.
    pub fn internal(chat_id: i64, user_id: Option<i64>, message_text: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4().to_string(), chat_id, user_id, None, message_text)
    }

    pub fn stash_insert(&mut self, key: &str, value: String) {
        self.stash.insert(key.to_string(), value);
    }

    pub fn stash_get(&self, key: &str) -> Option<&str> {
        self.stash.get(key).map(String::as_str)
    }
}
