use serde::Serialize;

/// Supergroup chat ids sit below this offset; the public deep-link form
/// strips it.
const SUPERGROUP_OFFSET: i64 = 1_000_000_000_000;

/// Fields for a message row about to be inserted. `created_at` is set by
/// the store at insertion time and never supplied by callers.
#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    pub chat_id: i64,
    pub user_id: Option<i64>,
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub text: Option<String>,
    pub external_message_id: Option<i64>,
    pub media_type: String,
    pub file_id: Option<String>,
    pub is_bot: bool,
    pub request_id: Option<String>,
    pub throttled: bool,
    pub reply_to_external_id: Option<i64>,
}

/// A persisted chat utterance. Append-only; rows only disappear through
/// retention pruning.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: i64,
    pub chat_id: i64,
    pub user_id: Option<i64>,
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub text: Option<String>,
    pub external_message_id: Option<i64>,
    pub media_type: String,
    pub file_id: Option<String>,
    pub is_bot: bool,
    pub request_id: Option<String>,
    pub throttled: bool,
    pub reply_to_external_id: Option<i64>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct UserFact {
    pub id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub fact_text: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Rolling summary kind. The string forms are what lands in the
/// `summary_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKind {
    SevenDay,
    ThirtyDay,
}

impl SummaryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryKind::SevenDay => "7day",
            SummaryKind::ThirtyDay => "30day",
        }
    }

    /// Length of the summarized window in days.
    pub fn window_days(&self) -> i64 {
        match self {
            SummaryKind::SevenDay => 7,
            SummaryKind::ThirtyDay => 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatSummary {
    pub id: i64,
    pub chat_id: i64,
    pub summary_type: String,
    pub summary_text: String,
    pub period_start: String,
    pub period_end: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewMediaCacheEntry {
    pub media_id: String,
    pub chat_id: i64,
    pub user_id: Option<i64>,
    pub file_path: String,
    pub media_type: String,
    pub expires_at: String,
}

#[derive(Debug, Clone)]
pub struct MediaCacheEntry {
    pub id: i64,
    pub media_id: String,
    pub chat_id: i64,
    pub user_id: Option<i64>,
    pub file_path: String,
    pub media_type: String,
    pub expires_at: String,
    pub created_at: String,
}

/// One full-text search hit, with a frontend-ready deep link when the chat
/// supports one.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chat_id: i64,
    pub message_id: Option<i64>,
    pub text: String,
    pub created_at: String,
    pub message_link: String,
}

/// Compose the public deep link for a message.
///
/// Only chats below the supergroup offset have a public `t.me/c/...` form;
/// everything else (basic groups, private chats) yields an empty string.
pub fn deep_link(chat_id: i64, message_id: i64) -> String {
    if chat_id < -SUPERGROUP_OFFSET {
        format!("https://t.me/c/{}/{}", -chat_id - SUPERGROUP_OFFSET, message_id)
    } else {
        String::new()
    }
}
