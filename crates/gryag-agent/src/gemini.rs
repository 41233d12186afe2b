//! Gemini `generateContent` client.
//!
//! One client serves three call shapes: the tool-loop chat call, a plain
//! text completion (summarizer), and image generation/editing against the
//! image model. Conversations travel as raw JSON contents so the tool loop
//! can append `functionCall`/`functionResponse` parts the structured types
//! can't express.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{FunctionDecl, LlmProvider, ModelReply, ProviderError, ReplyPart};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, image_model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
            image_model,
        }
    }

    /// Override the API base URL (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    async fn call(&self, model: &str, body: serde_json::Value) -> Result<ApiResponse, ProviderError> {
        debug!(%model, "sending generateContent request");
        let resp = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status == 429 {
            let retry = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(5000);
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry,
            });
        }
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "Gemini API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        resp.json::<ApiResponse>()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }

    /// Answer a query with Google Search grounding enabled. Returns the
    /// grounded text.
    pub async fn grounded_answer(&self, query: &str) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": query }] }],
            "tools": [{ "googleSearch": {} }],
        });
        let resp = self.call(&self.model, body).await?;
        Ok(parse_reply(resp).text())
    }

    /// Generate (or, with `base`, edit) an image. Returns `(base64, mime)`.
    pub async fn generate_image(
        &self,
        prompt: &str,
        base: Option<(&str, &str)>,
    ) -> Result<(String, String), ProviderError> {
        let mut parts = vec![serde_json::json!({ "text": prompt })];
        if let Some((mime_type, data)) = base {
            parts.push(serde_json::json!({
                "inlineData": { "mimeType": mime_type, "data": data },
            }));
        }
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": parts }],
        });

        let resp = self.call(&self.image_model, body).await?;
        for part in parse_reply(resp).parts {
            if let ReplyPart::InlineData { mime_type, data } = part {
                return Ok((data, mime_type));
            }
        }
        Err(ProviderError::NoImage)
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    /// Chat call with tools. `contents` is the accumulated conversation in
    /// wire form; the reply preserves part order.
    async fn generate(
        &self,
        system: &str,
        contents: &[serde_json::Value],
        tools: &[FunctionDecl],
    ) -> Result<ModelReply, ProviderError> {
        let mut body = serde_json::json!({
            "systemInstruction": { "parts": [{ "text": system }] },
            "contents": contents,
        });
        if !tools.is_empty() {
            body["tools"] = serde_json::json!([{ "functionDeclarations": tools }]);
        }

        let resp = self.call(&self.model, body).await?;
        Ok(parse_reply(resp))
    }
}

fn parse_reply(resp: ApiResponse) -> ModelReply {
    let mut reply = ModelReply::default();
    let Some(candidate) = resp.candidates.into_iter().next() else {
        return reply;
    };
    reply.finish_reason = candidate.finish_reason.unwrap_or_default();
    let Some(content) = candidate.content else {
        return reply;
    };
    for part in content.parts {
        if let Some(text) = part.text {
            reply.parts.push(ReplyPart::Text(text));
        } else if let Some(call) = part.function_call {
            reply.parts.push(ReplyPart::FunctionCall {
                name: call.name,
                args: call.args,
            });
        } else if let Some(blob) = part.inline_data {
            reply.parts.push(ReplyPart::InlineData {
                mime_type: blob.mime_type,
                data: blob.data,
            });
        }
    }
    reply
}

// Gemini API response types (private — only used for deserialization).

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Deserialize)]
struct ApiPart {
    text: Option<String>,
    #[serde(rename = "functionCall")]
    function_call: Option<ApiFunctionCall>,
    #[serde(rename = "inlineData")]
    inline_data: Option<ApiInlineData>,
}

#[derive(Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Deserialize)]
struct ApiInlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ModelReply {
        parse_reply(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn parse_text_reply() {
        let reply = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"hello "},{"text":"world"}],
                "role":"model"},"finishReason":"STOP"}]}"#,
        );
        assert_eq!(reply.text(), "hello world");
        assert!(!reply.has_function_call());
        assert_eq!(reply.finish_reason, "STOP");
    }

    #[test]
    fn parse_function_call() {
        let reply = parse(
            r#"{"candidates":[{"content":{"parts":[
                {"functionCall":{"name":"weather","args":{"city":"Kyiv"}}}],
                "role":"model"}}]}"#,
        );
        assert!(reply.has_function_call());
        match &reply.parts[0] {
            ReplyPart::FunctionCall { name, args } => {
                assert_eq!(name, "weather");
                assert_eq!(args["city"], "Kyiv");
            }
            other => panic!("unexpected part: {other:?}"),
        }
    }

    #[test]
    fn parse_mixed_parts_preserves_order() {
        let reply = parse(
            r#"{"candidates":[{"content":{"parts":[
                {"text":"let me check"},
                {"functionCall":{"name":"web_search","args":{}}}],
                "role":"model"}}]}"#,
        );
        assert!(matches!(reply.parts[0], ReplyPart::Text(_)));
        assert!(matches!(reply.parts[1], ReplyPart::FunctionCall { .. }));
    }

    #[test]
    fn parse_inline_data() {
        let reply = parse(
            r#"{"candidates":[{"content":{"parts":[
                {"inlineData":{"mimeType":"image/png","data":"AAA="}}],
                "role":"model"}}]}"#,
        );
        match &reply.parts[0] {
            ReplyPart::InlineData { mime_type, data } => {
                assert_eq!(mime_type, "image/png");
                assert_eq!(data, "AAA=");
            }
            other => panic!("unexpected part: {other:?}"),
        }
    }

    #[test]
    fn parse_empty_candidates() {
        assert!(parse(r#"{"candidates":[]}"#).is_empty());
        assert!(parse(r#"{}"#).is_empty());
        // Candidate with no content block (e.g. pure safety stop).
        assert!(parse(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).is_empty());
    }
}
