//! Full-text search over the current chat's history.

use std::sync::Arc;

use async_trait::async_trait;

use gryag_store::Store;

use crate::request::RequestContext;

use super::{Tool, ToolResult};

pub struct SearchMessagesTool {
    store: Arc<Store>,
}

impl SearchMessagesTool {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SearchMessagesTool {
    fn name(&self) -> &str {
        "search_messages"
    }

    fn description(&self) -> &str {
        "Search this chat's message history by keywords. Returns matching \
         messages with timestamps and, where available, links the user can \
         open."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Keywords to search for. All terms must match."
                },
                "limit": {
                    "type": "integer",
                    "description": "Max results, 1-50. Default 10."
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: serde_json::Value, ctx: &RequestContext) -> ToolResult {
        let query = match input.get("query").and_then(|v| v.as_str()) {
            Some(q) if !q.trim().is_empty() => q,
            _ => return ToolResult::error("missing required parameter: query"),
        };
        let limit = input
            .get("limit")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize;

        match self.store.search_messages(ctx.chat_id, query, limit) {
            Ok(hits) if hits.is_empty() => {
                ToolResult::success(format!("No messages found for: {query}"))
            }
            Ok(hits) => {
                let mut out = format!("Found {} message(s):\n", hits.len());
                for hit in &hits {
                    out.push_str(&format!("[{}] {}", hit.created_at, hit.text));
                    if !hit.message_link.is_empty() {
                        out.push_str(&format!(" ({})", hit.message_link));
                    }
                    out.push('\n');
                }
                ToolResult::success(out.trim_end().to_string())
            }
            Err(e) => ToolResult::error(format!("search_messages failed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gryag_store::NewMessage;

    #[tokio::test]
    async fn search_returns_links_for_supergroups() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        store
            .insert_message(&NewMessage {
                chat_id: -1002604868951,
                user_id: Some(1),
                text: Some("deploy finished".into()),
                external_message_id: Some(77),
                ..Default::default()
            })
            .unwrap();

        let ctx = RequestContext::new("req", -1002604868951, Some(1), None, "");
        let result = SearchMessagesTool::new(store)
            .execute(serde_json::json!({"query": "deploy"}), &ctx)
            .await;

        assert!(!result.is_error);
        assert!(result.content.contains("deploy finished"));
        assert!(result.content.contains("https://t.me/c/2604868951/77"));
    }

    #[tokio::test]
    async fn blank_query_is_error() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let ctx = RequestContext::new("req", -1, None, None, "");
        let result = SearchMessagesTool::new(store)
            .execute(serde_json::json!({"query": "  "}), &ctx)
            .await;
        assert!(result.is_error);
    }
}
