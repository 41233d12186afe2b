//! Dynamic context assembly for one model call.
//!
//! Produces the system block (persona, tool catalogue, rolling summaries,
//! stored facts) and the ordered conversation contents (enveloped history,
//! then the current message with any inline media). Store failures here are
//! fatal for the request — the orchestrator maps them to a localized error
//! reply.

use chrono::DateTime;

use gryag_core::types::speaker_label;
use gryag_store::{Store, StoreError, StoredMessage, SummaryKind};

pub struct ContextInput<'a> {
    pub chat_id: i64,
    pub user_id: Option<i64>,
    pub username: &'a str,
    pub first_name: &'a str,
    pub text: &'a str,
    /// Current-message attachment as `(mime, base64)`.
    pub media: Option<(&'a str, &'a str)>,
    /// Message row to leave out of the fetched history — the inbound
    /// message is persisted before the context is built and must not
    /// appear twice.
    pub exclude_id: Option<i64>,
}

pub struct BuiltContext {
    pub system: String,
    pub contents: Vec<serde_json::Value>,
}

pub fn build_context(
    store: &Store,
    persona: &str,
    tool_block: &str,
    input: &ContextInput<'_>,
    history_size: usize,
) -> Result<BuiltContext, StoreError> {
    let mut system = String::from(persona);

    if !tool_block.is_empty() {
        system.push_str("\n\n## Available tools\n");
        system.push_str(tool_block);
    }

    let week = store.get_latest_summary(input.chat_id, SummaryKind::SevenDay)?;
    if !week.is_empty() {
        system.push_str("\n\n## Chat summary, last 7 days\n");
        system.push_str(&week);
    }
    let month = store.get_latest_summary(input.chat_id, SummaryKind::ThirtyDay)?;
    if !month.is_empty() {
        system.push_str("\n\n## Chat summary, last 30 days\n");
        system.push_str(&month);
    }

    let display = speaker_label(input.user_id, Some(input.first_name), Some(input.username));
    if let Some(user_id) = input.user_id {
        let facts = store.get_user_facts(input.chat_id, user_id)?;
        if !facts.is_empty() {
            system.push_str(&format!("\n\n## Known about {display}\n"));
            for fact in &facts {
                system.push_str(&format!("- {}\n", fact.fact_text));
            }
        }
    }

    let history = store.get_recent_messages(input.chat_id, history_size)?;
    let mut contents: Vec<serde_json::Value> = history
        .iter()
        .filter(|m| input.exclude_id != Some(m.id))
        .map(history_turn)
        .collect();

    let mut parts = vec![serde_json::json!({
        "text": envelope(&display, input.user_id, None, input.text),
    })];
    if let Some((mime, data)) = input.media {
        parts.push(serde_json::json!({
            "inlineData": { "mimeType": mime, "data": data },
        }));
    }
    contents.push(serde_json::json!({ "role": "user", "parts": parts }));

    Ok(BuiltContext { system, contents })
}

/// Map a stored message onto a conversation turn. Bot replies come back as
/// bare model turns; user messages get a speaker/timestamp envelope.
fn history_turn(msg: &StoredMessage) -> serde_json::Value {
    let text = msg.text.clone().unwrap_or_else(|| {
        if msg.media_type.is_empty() {
            String::new()
        } else {
            format!("[{}]", msg.media_type)
        }
    });
    if msg.is_bot {
        serde_json::json!({ "role": "model", "parts": [{ "text": text }] })
    } else {
        let label = speaker_label(
            msg.user_id,
            msg.display_name.as_deref(),
            msg.username.as_deref(),
        );
        serde_json::json!({
            "role": "user",
            "parts": [{ "text": envelope(&label, msg.user_id, Some(&msg.created_at), &text) }],
        })
    }
}

/// Header format: `[label (uid) YYYY-MM-DD HH:MM UTC] text`. The id is
/// omitted when it already is the label; the timestamp when not available.
fn envelope(label: &str, user_id: Option<i64>, created_at: Option<&str>, text: &str) -> String {
    let mut header = String::from(label);
    if let Some(id) = user_id {
        if id.to_string() != label {
            header.push_str(&format!(" ({id})"));
        }
    }
    if let Some(ts) = created_at {
        if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
            header.push_str(&dt.format(" %Y-%m-%d %H:%M UTC").to_string());
        }
    }
    format!("[{header}] {text}")
}
