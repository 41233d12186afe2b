use serde::{Deserialize, Serialize};

/// Inbound payload for `POST /api/v1/process`, forwarded by the chat
/// frontend. All fields except `chat_id` are optional on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessRequest {
    pub chat_id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub message_id: i64,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub media_type: String,
    #[serde(default)]
    pub media_base64: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub reply_to_message_id: Option<i64>,
}

impl ProcessRequest {
    /// Human label for the sender: first name, else username, else the
    /// numeric id when neither is set.
    pub fn display_name(&self) -> String {
        speaker_label(
            self.user_id,
            Some(self.first_name.as_str()),
            Some(self.username.as_str()),
        )
    }

    /// Effective MIME type of the attached media, inferring from
    /// `media_type` when the frontend left `mime_type` empty.
    pub fn effective_mime(&self) -> String {
        if !self.mime_type.is_empty() {
            self.mime_type.clone()
        } else {
            infer_mime(&self.media_type).to_string()
        }
    }
}

/// Outbound payload for `POST /api/v1/process`.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessResponse {
    pub reply: String,
    pub request_id: String,
    pub media_base64: String,
    pub media_type: String,
}

impl ProcessResponse {
    pub fn text(reply: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            request_id: request_id.into(),
            media_base64: String::new(),
            media_type: String::new(),
        }
    }
}

/// Map a frontend media-type tag to a MIME type.
pub fn infer_mime(media_type: &str) -> &'static str {
    match media_type {
        "photo" => "image/jpeg",
        "document" => "image/png",
        "video" | "video_note" | "animation" => "video/mp4",
        "voice" => "audio/ogg",
        "sticker" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Speaker label precedence: first name > username > numeric id.
/// A user with neither name nor username is identified only by id.
pub fn speaker_label(user_id: Option<i64>, first_name: Option<&str>, username: Option<&str>) -> String {
    if let Some(name) = first_name.filter(|s| !s.is_empty()) {
        return name.to_string();
    }
    if let Some(name) = username.filter(|s| !s.is_empty()) {
        return name.to_string();
    }
    match user_id {
        Some(id) => id.to_string(),
        None => "unknown".to_string(),
    }
}
