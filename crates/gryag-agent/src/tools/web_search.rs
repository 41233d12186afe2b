//! Web search through the model's own Google Search grounding.

use std::sync::Arc;

use async_trait::async_trait;

use crate::gemini::GeminiClient;
use crate::request::RequestContext;

use super::{Tool, ToolResult};

pub struct WebSearchTool {
    gemini: Arc<GeminiClient>,
}

impl WebSearchTool {
    pub fn new(gemini: Arc<GeminiClient>) -> Self {
        Self { gemini }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information and return a short grounded \
         answer. Use for anything that may have changed since training."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to search for."
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: serde_json::Value, _ctx: &RequestContext) -> ToolResult {
        let query = match input.get("query").and_then(|v| v.as_str()) {
            Some(q) if !q.trim().is_empty() => q,
            _ => return ToolResult::error("missing required parameter: query"),
        };
        match self.gemini.grounded_answer(query).await {
            Ok(answer) if answer.trim().is_empty() => {
                ToolResult::error("search returned no answer")
            }
            Ok(answer) => ToolResult::success(answer),
            Err(e) => ToolResult::error(format!("web_search failed: {e}")),
        }
    }
}
