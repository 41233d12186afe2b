//! Code execution against an external sandbox runner.
//!
//! The runner is a separate service; this tool only speaks its HTTP
//! contract: `POST {code, language}` → `{stdout, stderr, exit_code}`.

use async_trait::async_trait;
use serde::Deserialize;

use crate::request::RequestContext;

use super::{Tool, ToolResult};

pub struct SandboxTool {
    client: reqwest::Client,
    url: String,
}

impl SandboxTool {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl Tool for SandboxTool {
    fn name(&self) -> &str {
        "sandbox"
    }

    fn description(&self) -> &str {
        "Run a short code snippet in an isolated sandbox and return its \
         output. Supported languages: python, bash."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "code": { "type": "string", "description": "The code to run." },
                "language": {
                    "type": "string",
                    "description": "Language of the snippet. Default 'python'."
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, input: serde_json::Value, _ctx: &RequestContext) -> ToolResult {
        let code = match input.get("code").and_then(|v| v.as_str()) {
            Some(c) if !c.trim().is_empty() => c,
            _ => return ToolResult::error("missing required parameter: code"),
        };
        let language = input
            .get("language")
            .and_then(|v| v.as_str())
            .unwrap_or("python");

        let resp = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "code": code, "language": language }))
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => return ToolResult::error(format!("sandbox unreachable: {e}")),
        };
        if !resp.status().is_success() {
            return ToolResult::error(format!("sandbox returned {}", resp.status()));
        }

        match resp.json::<SandboxOutput>().await {
            Ok(out) => {
                let mut report = String::new();
                if !out.stdout.is_empty() {
                    report.push_str(&out.stdout);
                }
                if !out.stderr.is_empty() {
                    report.push_str(&format!("\nstderr:\n{}", out.stderr));
                }
                if out.exit_code != 0 {
                    report.push_str(&format!("\nexit code: {}", out.exit_code));
                }
                if report.is_empty() {
                    report.push_str("(no output)");
                }
                ToolResult::success(report)
            }
            Err(e) => ToolResult::error(format!("sandbox response invalid: {e}")),
        }
    }
}

#[derive(Deserialize)]
struct SandboxOutput {
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    #[serde(default)]
    exit_code: i32,
}
