//! LLM provider interface and the value types shared between the client,
//! the tool registry, and the orchestrator's tool loop.

use async_trait::async_trait;
use serde::Serialize;

/// Tool declaration sent to the model on every call.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionDecl {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// One part of a model reply, in candidate order.
#[derive(Debug, Clone)]
pub enum ReplyPart {
    Text(String),
    FunctionCall {
        name: String,
        args: serde_json::Value,
    },
    InlineData {
        mime_type: String,
        data: String,
    },
}

/// A parsed non-streaming model reply.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub parts: Vec<ReplyPart>,
    pub finish_reason: String,
}

impl ModelReply {
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn has_function_call(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, ReplyPart::FunctionCall { .. }))
    }

    /// Concatenated text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ReplyPart::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Non-streaming chat interface implemented by the Gemini client (and by
/// scripted providers in tests).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// One model call over the accumulated conversation.
    async fn generate(
        &self,
        system: &str,
        contents: &[serde_json::Value],
        tools: &[FunctionDecl],
    ) -> Result<ModelReply, ProviderError>;

    /// Single-turn text completion with no tools.
    async fn complete_text(
        &self,
        system: &str,
        user_text: &str,
    ) -> Result<String, ProviderError> {
        let contents = vec![serde_json::json!({
            "role": "user",
            "parts": [{ "text": user_text }],
        })];
        Ok(self.generate(system, &contents, &[]).await?.text())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("no image data in model response")]
    NoImage,
}
