//! Tool system for the model's function calling.
//!
//! Each tool declares a name, a description, and a JSON-Schema parameter
//! shape, and executes against the per-request context. The registry turns
//! the catalogue into model-facing declarations and a human-readable block
//! for the persona.

pub mod currency;
pub mod facts;
pub mod image;
pub mod sandbox;
pub mod search_messages;
pub mod weather;
pub mod web_search;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::provider::FunctionDecl;
use crate::request::RequestContext;

/// Result of executing a tool. `content` goes back to the model either as
/// `{result: …}` or `{error: …}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            is_error: true,
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name (e.g. "remember_fact").
    fn name(&self) -> &str;
    /// What the tool does, phrased for the model.
    fn description(&self) -> &str;
    /// JSON Schema for the tool's arguments.
    fn input_schema(&self) -> serde_json::Value;
    /// Run the tool with parsed-JSON arguments.
    async fn execute(&self, input: serde_json::Value, ctx: &RequestContext) -> ToolResult;
}

pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Model-facing declarations, sent on every generate call.
    pub fn declarations(&self) -> Vec<FunctionDecl> {
        self.tools
            .iter()
            .map(|t| FunctionDecl {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.input_schema(),
            })
            .collect()
    }

    /// Human-readable catalogue block embedded into the context so the
    /// persona knows which tools exist.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for tool in &self.tools {
            out.push_str(&format!("- {}: {}\n", tool.name(), tool.description()));
        }
        out
    }

    /// Dispatch a named call. Unknown names come back as a structured
    /// error result — never a panic, never an aborted loop.
    pub async fn execute(
        &self,
        name: &str,
        input: serde_json::Value,
        ctx: &RequestContext,
    ) -> ToolResult {
        match self.tools.iter().find(|t| t.name() == name) {
            Some(tool) => {
                debug!(tool = %name, chat_id = ctx.chat_id, "executing tool");
                tool.execute(input, ctx).await
            }
            None => ToolResult::error(format!("unknown tool: {name}")),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
