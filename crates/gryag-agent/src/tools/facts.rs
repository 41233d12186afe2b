//! Stored-fact tools — remember, list, and forget facts about chat members.

use std::sync::Arc;

use async_trait::async_trait;

use gryag_store::Store;

use crate::request::RequestContext;

use super::{Tool, ToolResult};

/// Persist a short fact about the current speaker (or another member).
pub struct RememberFactTool {
    store: Arc<Store>,
}

impl RememberFactTool {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for RememberFactTool {
    fn name(&self) -> &str {
        "remember_fact"
    }

    fn description(&self) -> &str {
        "Save a short fact about a chat member for future conversations \
         (e.g. 'works as a nurse', 'hates cilantro'). Saving the same fact \
         twice is harmless."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "fact": {
                    "type": "string",
                    "description": "The fact to remember, one short sentence."
                },
                "user_id": {
                    "type": "integer",
                    "description": "Member the fact is about. Defaults to the current speaker."
                }
            },
            "required": ["fact"]
        })
    }

    async fn execute(&self, input: serde_json::Value, ctx: &RequestContext) -> ToolResult {
        let fact = match input.get("fact").and_then(|v| v.as_str()) {
            Some(f) if !f.trim().is_empty() => f,
            _ => return ToolResult::error("missing required parameter: fact"),
        };
        let user_id = input
            .get("user_id")
            .and_then(|v| v.as_i64())
            .or(ctx.user_id);
        let Some(user_id) = user_id else {
            return ToolResult::error("no user to attach the fact to");
        };

        match self.store.insert_user_fact(ctx.chat_id, user_id, fact) {
            Ok(0) => ToolResult::success("Already known."),
            Ok(id) => ToolResult::success(format!("Remembered (fact #{id}).")),
            Err(e) => ToolResult::error(format!("remember_fact failed: {e}")),
        }
    }
}

/// List facts stored about a member, with ids usable by `forget_fact`.
pub struct ListFactsTool {
    store: Arc<Store>,
}

impl ListFactsTool {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListFactsTool {
    fn name(&self) -> &str {
        "list_facts"
    }

    fn description(&self) -> &str {
        "List the facts currently stored about a chat member, with their ids."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "user_id": {
                    "type": "integer",
                    "description": "Member to list facts for. Defaults to the current speaker."
                }
            }
        })
    }

    async fn execute(&self, input: serde_json::Value, ctx: &RequestContext) -> ToolResult {
        let user_id = input
            .get("user_id")
            .and_then(|v| v.as_i64())
            .or(ctx.user_id);
        let Some(user_id) = user_id else {
            return ToolResult::error("no user to list facts for");
        };

        match self.store.get_user_facts(ctx.chat_id, user_id) {
            Ok(facts) if facts.is_empty() => ToolResult::success("No facts stored."),
            Ok(facts) => {
                let lines: Vec<String> = facts
                    .iter()
                    .map(|f| format!("#{}: {}", f.id, f.fact_text))
                    .collect();
                ToolResult::success(lines.join("\n"))
            }
            Err(e) => ToolResult::error(format!("list_facts failed: {e}")),
        }
    }
}

/// Delete a stored fact by id.
pub struct ForgetFactTool {
    store: Arc<Store>,
}

impl ForgetFactTool {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ForgetFactTool {
    fn name(&self) -> &str {
        "forget_fact"
    }

    fn description(&self) -> &str {
        "Delete a stored fact by its id (use list_facts to find the id)."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "fact_id": {
                    "type": "integer",
                    "description": "Id of the fact to delete."
                }
            },
            "required": ["fact_id"]
        })
    }

    async fn execute(&self, input: serde_json::Value, _ctx: &RequestContext) -> ToolResult {
        let Some(id) = input.get("fact_id").and_then(|v| v.as_i64()) else {
            return ToolResult::error("missing required parameter: fact_id");
        };
        match self.store.delete_user_fact(id) {
            Ok(true) => ToolResult::success("Forgotten."),
            Ok(false) => ToolResult::error(format!("no fact with id {id}")),
            Err(e) => ToolResult::error(format!("forget_fact failed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Arc<Store>, RequestContext) {
        (
            Arc::new(Store::open_in_memory().unwrap()),
            RequestContext::new("req", -1, Some(42), None, "hi"),
        )
    }

    #[tokio::test]
    async fn remember_then_duplicate() {
        let (store, ctx) = setup();
        let tool = RememberFactTool::new(store.clone());

        let first = tool
            .execute(serde_json::json!({"fact": "plays bass"}), &ctx)
            .await;
        assert!(!first.is_error);
        assert!(first.content.contains("Remembered"));

        let dup = tool
            .execute(serde_json::json!({"fact": "plays bass"}), &ctx)
            .await;
        assert!(!dup.is_error);
        assert_eq!(dup.content, "Already known.");
        assert_eq!(store.get_user_facts(-1, 42).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remember_requires_some_user() {
        let (store, _) = setup();
        let ctx = RequestContext::new("req", -1, None, None, "");
        let tool = RememberFactTool::new(store);
        let result = tool.execute(serde_json::json!({"fact": "x"}), &ctx).await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn list_and_forget_round_trip() {
        let (store, ctx) = setup();
        store.insert_user_fact(-1, 42, "vegan").unwrap();

        let listed = ListFactsTool::new(store.clone())
            .execute(serde_json::json!({}), &ctx)
            .await;
        assert!(listed.content.contains("vegan"));
        let id: i64 = listed
            .content
            .trim_start_matches('#')
            .split(':')
            .next()
            .unwrap()
            .parse()
            .unwrap();

        let forget = ForgetFactTool::new(store.clone())
            .execute(serde_json::json!({"fact_id": id}), &ctx)
            .await;
        assert!(!forget.is_error);
        assert!(store.get_user_facts(-1, 42).unwrap().is_empty());
    }
}
