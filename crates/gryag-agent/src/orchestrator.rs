//! Per-message request orchestration.
//!
//! Flow: persist the inbound message → build the dynamic context → run the
//! bounded model/tool loop → persist the bot reply → return the response
//! payload. Image tool outputs are intercepted on the way through: the
//! bytes ride the HTTP response and land in the media cache; the model only
//! sees a short substitute plus the opaque `media_id`.
//!
//! The orchestrator holds no per-chat state — different chats run fully in
//! parallel, and per-chat serialization is the admission lock's job.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{debug, error, info, warn};

use gryag_core::i18n::{Localizer, ERROR_CONTEXT_BUILD, ERROR_GENERATION};
use gryag_core::types::{ProcessRequest, ProcessResponse};
use gryag_store::{NewMessage, Store};

use crate::context::{build_context, ContextInput};
use crate::media::MediaCache;
use crate::persona::Persona;
use crate::provider::{LlmProvider, ModelReply, ProviderError, ReplyPart};
use crate::request::{RequestContext, STASH_INBOUND_MEDIA_B64, STASH_INBOUND_MEDIA_MIME};
use crate::tools::{ToolRegistry, ToolResult};

/// Hard cap on model/tool exchanges per request.
const MAX_TOOL_ITERATIONS: usize = 5;

/// Tools whose output is intercepted into the media cache.
const IMAGE_TOOLS: &[&str] = &["generate_image", "edit_image"];

/// Substitute text the model sees instead of raw image bytes.
const IMAGE_SUBSTITUTE: &str = "Image generated and attached to the reply message.";

/// Literal current-message text for scheduler-initiated turns.
pub const PROACTIVE_TURN_TEXT: &str = "[Proactive turn]";

const PROACTIVE_INSTRUCTION: &str = "You are starting this turn on your own \
initiative — nobody has messaged you just now. You may react to something \
recent in the chat or open a fresh short in-character topic. If you have \
nothing worthwhile to add, output nothing at all.";

const PROACTIVE_SEARCH_SUFFIX: &str = " This time, use the web_search tool \
first and share one interesting finding with the chat.";

#[derive(Debug, Default)]
struct LoopOutcome {
    reply: String,
    media_base64: String,
    media_type: String,
}

pub struct Orchestrator {
    store: Arc<Store>,
    provider: Arc<dyn LlmProvider>,
    registry: Arc<ToolRegistry>,
    persona: Arc<Persona>,
    localizer: Arc<Localizer>,
    media: MediaCache,
    immediate_context_size: usize,
    enable_voice_stt: bool,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<Store>,
        provider: Arc<dyn LlmProvider>,
        registry: Arc<ToolRegistry>,
        persona: Arc<Persona>,
        localizer: Arc<Localizer>,
        media: MediaCache,
        immediate_context_size: usize,
        enable_voice_stt: bool,
    ) -> Self {
        Self {
            store,
            provider,
            registry,
            persona,
            localizer,
            media,
            immediate_context_size,
            enable_voice_stt,
        }
    }

    /// Run the full pipeline for one admitted message. Always produces a
    /// response payload: model and context failures come back as localized
    /// error replies with the original request id.
    pub async fn process(
        &self,
        req: &ProcessRequest,
        rctx: &mut RequestContext,
    ) -> ProcessResponse {
        // Persist the inbound message before anything can fail downstream,
        // so even failed requests contribute to history.
        let inbound_id = match self.store.insert_message(&inbound_row(req, &rctx.request_id)) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(request_id = %rctx.request_id, error = %e, "inbound persist failed");
                None
            }
        };

        // Decode the attachment. A bad blob is logged and dropped — the
        // request continues text-only.
        let media = self.decode_inbound_media(req, rctx);

        let built = {
            let input = ContextInput {
                chat_id: req.chat_id,
                user_id: req.user_id,
                username: &req.username,
                first_name: &req.first_name,
                text: &req.text,
                media: media
                    .as_ref()
                    .map(|(mime, data)| (mime.as_str(), data.as_str())),
                exclude_id: inbound_id,
            };
            match build_context(
                &self.store,
                &self.persona.current(),
                &self.registry.describe(),
                &input,
                self.immediate_context_size,
            ) {
                Ok(built) => built,
                Err(e) => {
                    error!(request_id = %rctx.request_id, error = %e, "context build failed");
                    return ProcessResponse::text(
                        self.localizer.get(ERROR_CONTEXT_BUILD),
                        rctx.request_id.as_str(),
                    );
                }
            }
        };

        let outcome = match self
            .run_tool_loop(&built.system, built.contents, rctx, false)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(request_id = %rctx.request_id, error = %e, "generation failed");
                return ProcessResponse::text(
                    self.localizer.get(ERROR_GENERATION),
                    rctx.request_id.as_str(),
                );
            }
        };

        // Reply persistence is best-effort: the user still gets the reply.
        if !outcome.reply.is_empty() || !outcome.media_base64.is_empty() {
            let bot_row = NewMessage {
                chat_id: req.chat_id,
                text: Some(outcome.reply.clone()),
                is_bot: true,
                request_id: Some(rctx.request_id.clone()),
                media_type: if outcome.media_base64.is_empty() {
                    String::new()
                } else {
                    outcome.media_type.clone()
                },
                ..Default::default()
            };
            if let Err(e) = self.store.insert_message(&bot_row) {
                warn!(request_id = %rctx.request_id, error = %e, "reply persist failed");
            }
        }

        info!(
            request_id = %rctx.request_id,
            chat_id = req.chat_id,
            reply_chars = outcome.reply.len(),
            has_media = !outcome.media_base64.is_empty(),
            "request complete"
        );

        ProcessResponse {
            reply: outcome.reply,
            request_id: rctx.request_id.clone(),
            media_base64: outcome.media_base64,
            media_type: outcome.media_type,
        }
    }

    /// Compose an unsolicited message for a chat under the proactive
    /// scheduler's initiative. Returns `None` when the chat has no known
    /// human sender, the model declined to say anything, or anything
    /// failed — proactive turns never surface errors.
    pub async fn compose_proactive(&self, chat_id: i64, want_search: bool) -> Option<String> {
        let sender = match self.store.get_last_human_sender(chat_id) {
            Ok(found) => found?,
            Err(e) => {
                warn!(chat_id, error = %e, "proactive sender lookup failed");
                return None;
            }
        };
        let (user_id, display_name, username) = sender;
        let rctx = RequestContext::internal(chat_id, Some(user_id), PROACTIVE_TURN_TEXT);

        let input = ContextInput {
            chat_id,
            user_id: Some(user_id),
            username: username.as_deref().unwrap_or(""),
            first_name: display_name.as_deref().unwrap_or(""),
            text: PROACTIVE_TURN_TEXT,
            media: None,
            exclude_id: None,
        };
        let built = match build_context(
            &self.store,
            &self.persona.current(),
            &self.registry.describe(),
            &input,
            self.immediate_context_size,
        ) {
            Ok(built) => built,
            Err(e) => {
                warn!(chat_id, error = %e, "proactive context build failed");
                return None;
            }
        };

        let mut instruction = PROACTIVE_INSTRUCTION.to_string();
        if want_search && self.registry.has("web_search") {
            instruction.push_str(PROACTIVE_SEARCH_SUFFIX);
        }
        let mut contents = built.contents;
        contents.insert(
            0,
            serde_json::json!({ "role": "user", "parts": [{ "text": instruction }] }),
        );

        let outcome = match self.run_tool_loop(&built.system, contents, &rctx, true).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(chat_id, error = %e, "proactive generation failed");
                return None;
            }
        };

        let text = outcome.reply.trim().to_string();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// The bounded model/tool exchange. Each iteration appends at most two
    /// turns: the model's own content, then one synthetic user turn
    /// carrying all function responses — so the next call sees the model's
    /// prior requests. In proactive mode accumulated text is discarded
    /// after any tool-call iteration; only the final non-tool turn speaks.
    async fn run_tool_loop(
        &self,
        system: &str,
        mut contents: Vec<serde_json::Value>,
        rctx: &RequestContext,
        proactive: bool,
    ) -> Result<LoopOutcome, ProviderError> {
        let decls = self.registry.declarations();
        let mut outcome = LoopOutcome::default();

        for iteration in 0..MAX_TOOL_ITERATIONS {
            let reply = self.provider.generate(system, &contents, &decls).await?;
            if reply.is_empty() {
                debug!(iteration, "model returned no content");
                break;
            }
            contents.push(model_turn(&reply));

            let mut has_tool_call = false;
            let mut responses: Vec<serde_json::Value> = Vec::new();
            for part in &reply.parts {
                match part {
                    ReplyPart::Text(text) => outcome.reply.push_str(text),
                    ReplyPart::FunctionCall { name, args } => {
                        has_tool_call = true;
                        let result = self.registry.execute(name, args.clone(), rctx).await;
                        let payload = self.tool_response(name, result, rctx, &mut outcome);
                        responses.push(serde_json::json!({
                            "functionResponse": { "name": name, "response": payload },
                        }));
                    }
                    ReplyPart::InlineData { .. } => {}
                }
            }

            if !responses.is_empty() {
                contents.push(serde_json::json!({ "role": "user", "parts": responses }));
            }
            if !has_tool_call {
                break;
            }
            if proactive {
                outcome.reply.clear();
            }
        }

        Ok(outcome)
    }

    /// Build the structured function response for one executed tool,
    /// intercepting image payloads along the way.
    fn tool_response(
        &self,
        name: &str,
        result: ToolResult,
        rctx: &RequestContext,
        outcome: &mut LoopOutcome,
    ) -> serde_json::Value {
        if !result.is_error && IMAGE_TOOLS.contains(&name) {
            if let Some(payload) = self.intercept_image(&result.content, rctx, outcome) {
                return payload;
            }
        }
        if result.is_error {
            serde_json::json!({ "error": result.content })
        } else {
            serde_json::json!({ "result": result.content })
        }
    }

    /// When an image tool produced bytes, route them out-of-band: set the
    /// outbound media on the response, cache the bytes on disk with a TTL
    /// row, and hand the model only a short substitute plus the opaque id.
    /// Returns `None` when the output carries no image payload.
    fn intercept_image(
        &self,
        content: &str,
        rctx: &RequestContext,
        outcome: &mut LoopOutcome,
    ) -> Option<serde_json::Value> {
        let parsed: serde_json::Value = serde_json::from_str(content).ok()?;
        let data = parsed
            .get("media_base64")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())?;
        let media_type = parsed
            .get("media_type")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("photo");

        outcome.media_base64 = data.to_string();
        outcome.media_type = media_type.to_string();

        let bytes = match BASE64.decode(data) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(request_id = %rctx.request_id, error = %e, "image output not valid base64");
                return Some(serde_json::json!({ "result": IMAGE_SUBSTITUTE }));
            }
        };
        match self
            .media
            .store_image(&self.store, rctx.chat_id, rctx.user_id, &bytes)
        {
            Ok(media_id) => Some(serde_json::json!({
                "result": IMAGE_SUBSTITUTE,
                "media_id": media_id,
                "note": "media_id is internal. Never mention, echo, or describe it to the user.",
            })),
            Err(e) => {
                warn!(request_id = %rctx.request_id, error = %e, "media cache persist failed");
                Some(serde_json::json!({ "result": IMAGE_SUBSTITUTE }))
            }
        }
    }

    /// Decode and stash the inbound attachment. Returns the decoded blob
    /// as `(mime, base64)` for the context builder, or `None` when there is
    /// nothing usable.
    fn decode_inbound_media(
        &self,
        req: &ProcessRequest,
        rctx: &mut RequestContext,
    ) -> Option<(String, String)> {
        if req.media_base64.is_empty() {
            return None;
        }
        if req.media_type == "voice" && !self.enable_voice_stt {
            debug!(request_id = %rctx.request_id, "voice attachment ignored (STT disabled)");
            return None;
        }
        if let Err(e) = BASE64.decode(&req.media_base64) {
            warn!(request_id = %rctx.request_id, error = %e, "attachment base64 invalid, continuing without media");
            return None;
        }
        let mime = req.effective_mime();
        rctx.stash_insert(STASH_INBOUND_MEDIA_B64, req.media_base64.clone());
        rctx.stash_insert(STASH_INBOUND_MEDIA_MIME, mime.clone());
        Some((mime, req.media_base64.clone()))
    }
}

fn inbound_row(req: &ProcessRequest, request_id: &str) -> NewMessage {
    NewMessage {
        chat_id: req.chat_id,
        user_id: req.user_id,
        display_name: non_empty(&req.first_name),
        username: non_empty(&req.username),
        text: non_empty(&req.text),
        external_message_id: (req.message_id != 0).then_some(req.message_id),
        media_type: req.media_type.clone(),
        file_id: non_empty(&req.file_id),
        is_bot: false,
        request_id: Some(request_id.to_string()),
        throttled: false,
        reply_to_external_id: req.reply_to_message_id,
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Re-encode a parsed model reply as a wire-form `model` turn.
fn model_turn(reply: &ModelReply) -> serde_json::Value {
    let parts: Vec<serde_json::Value> = reply
        .parts
        .iter()
        .map(|part| match part {
            ReplyPart::Text(text) => serde_json::json!({ "text": text }),
            ReplyPart::FunctionCall { name, args } => serde_json::json!({
                "functionCall": { "name": name, "args": args },
            }),
            ReplyPart::InlineData { mime_type, data } => serde_json::json!({
                "inlineData": { "mimeType": mime_type, "data": data },
            }),
        })
        .collect();
    serde_json::json!({ "role": "model", "parts": parts })
}
