//! Image generation and editing against the image model.
//!
//! Both tools return their bytes as JSON (`media_base64`, `media_type`) in
//! the tool result. The orchestrator intercepts that payload: the bytes go
//! out on the response and into the media cache; the model only ever sees
//! a short substitute plus the opaque `media_id`.

use std::sync::Arc;

use async_trait::async_trait;

use gryag_store::Store;

use crate::gemini::GeminiClient;
use crate::media::MediaCache;
use crate::request::{RequestContext, STASH_INBOUND_MEDIA_B64, STASH_INBOUND_MEDIA_MIME};

use super::{Tool, ToolResult};

pub struct GenerateImageTool {
    gemini: Arc<GeminiClient>,
}

impl GenerateImageTool {
    pub fn new(gemini: Arc<GeminiClient>) -> Self {
        Self { gemini }
    }
}

#[async_trait]
impl Tool for GenerateImageTool {
    fn name(&self) -> &str {
        "generate_image"
    }

    fn description(&self) -> &str {
        "Generate an image from a text prompt. The image is attached to the \
         reply automatically — do not describe any identifiers from the \
         tool response to the user."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "What the image should show, in detail."
                }
            },
            "required": ["prompt"]
        })
    }

    async fn execute(&self, input: serde_json::Value, _ctx: &RequestContext) -> ToolResult {
        let prompt = match input.get("prompt").and_then(|v| v.as_str()) {
            Some(p) if !p.trim().is_empty() => p,
            _ => return ToolResult::error("missing required parameter: prompt"),
        };
        match self.gemini.generate_image(prompt, None).await {
            Ok((data, _mime)) => ToolResult::success(
                serde_json::json!({ "media_base64": data, "media_type": "photo" }).to_string(),
            ),
            Err(e) => ToolResult::error(format!("generate_image failed: {e}")),
        }
    }
}

pub struct EditImageTool {
    gemini: Arc<GeminiClient>,
    store: Arc<Store>,
    media: MediaCache,
}

impl EditImageTool {
    pub fn new(gemini: Arc<GeminiClient>, store: Arc<Store>, media: MediaCache) -> Self {
        Self {
            gemini,
            store,
            media,
        }
    }

    /// Resolve the base image: an explicit cached `media_id` wins, else the
    /// attachment the user sent with the current message.
    fn base_image(&self, input: &serde_json::Value, ctx: &RequestContext) -> Result<(String, String), String> {
        if let Some(media_id) = input.get("media_id").and_then(|v| v.as_str()) {
            return match self.media.load_base64(&self.store, media_id) {
                Ok(Some(found)) => Ok(found),
                Ok(None) => Err(format!("no cached image with id {media_id}")),
                Err(e) => Err(format!("image cache lookup failed: {e}")),
            };
        }
        match ctx.stash_get(STASH_INBOUND_MEDIA_B64) {
            Some(data) => {
                let mime = ctx
                    .stash_get(STASH_INBOUND_MEDIA_MIME)
                    .unwrap_or("image/jpeg")
                    .to_string();
                Ok((mime, data.to_string()))
            }
            None => Err("no base image: pass media_id or attach an image".to_string()),
        }
    }
}

#[async_trait]
impl Tool for EditImageTool {
    fn name(&self) -> &str {
        "edit_image"
    }

    fn description(&self) -> &str {
        "Edit an image according to a prompt. Use the media_id from a \
         previous generate_image response, or omit it to edit the image \
         attached to the current message. Never repeat identifiers from the \
         tool response to the user."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "The edit to apply."
                },
                "media_id": {
                    "type": "string",
                    "description": "Identifier of a previously generated image."
                }
            },
            "required": ["prompt"]
        })
    }

    async fn execute(&self, input: serde_json::Value, ctx: &RequestContext) -> ToolResult {
        let prompt = match input.get("prompt").and_then(|v| v.as_str()) {
            Some(p) if !p.trim().is_empty() => p,
            _ => return ToolResult::error("missing required parameter: prompt"),
        };
        let (mime, data) = match self.base_image(&input, ctx) {
            Ok(found) => found,
            Err(e) => return ToolResult::error(format!("edit_image failed: {e}")),
        };
        match self.gemini.generate_image(prompt, Some((&mime, &data))).await {
            Ok((data, _mime)) => ToolResult::success(
                serde_json::json!({ "media_base64": data, "media_type": "photo" }).to_string(),
            ),
            Err(e) => ToolResult::error(format!("edit_image failed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit_tool() -> EditImageTool {
        let gemini = Arc::new(GeminiClient::new("k".into(), "m".into(), "im".into()));
        let store = Arc::new(Store::open_in_memory().unwrap());
        let media = MediaCache::new(std::env::temp_dir(), 1);
        EditImageTool::new(gemini, store, media)
    }

    #[test]
    fn base_image_prefers_media_id_and_falls_back_to_stash() {
        let tool = edit_tool();
        let mut ctx = RequestContext::new("req", -1, None, None, "");

        // Nothing available at all.
        let err = tool.base_image(&serde_json::json!({}), &ctx).unwrap_err();
        assert!(err.contains("no base image"));

        // Stash fallback.
        ctx.stash_insert(STASH_INBOUND_MEDIA_B64, "QUJD".into());
        ctx.stash_insert(STASH_INBOUND_MEDIA_MIME, "image/webp".into());
        let (mime, data) = tool.base_image(&serde_json::json!({}), &ctx).unwrap();
        assert_eq!(mime, "image/webp");
        assert_eq!(data, "QUJD");

        // Unknown media_id is an error even when the stash is populated.
        let err = tool
            .base_image(&serde_json::json!({"media_id": "ghost"}), &ctx)
            .unwrap_err();
        assert!(err.contains("ghost"));
    }
}
