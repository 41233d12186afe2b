//! Currency conversion via the open.er-api.com daily rates feed.

use async_trait::async_trait;
use serde::Deserialize;

use crate::request::RequestContext;

use super::{Tool, ToolResult};

const RATES_URL: &str = "https://open.er-api.com/v6/latest";

pub struct CurrencyTool {
    client: reqwest::Client,
}

impl CurrencyTool {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn convert(&self, amount: f64, from: &str, to: &str) -> Result<String, String> {
        let rates: RatesResponse = self
            .client
            .get(format!("{RATES_URL}/{from}"))
            .send()
            .await
            .map_err(|e| format!("rates request failed: {e}"))?
            .json()
            .await
            .map_err(|e| format!("rates response invalid: {e}"))?;

        if rates.result != "success" {
            return Err(format!("unknown base currency: {from}"));
        }
        let rate = rates
            .rates
            .get(to)
            .ok_or_else(|| format!("unknown target currency: {to}"))?;
        Ok(format!("{amount} {from} = {:.2} {to}", amount * rate))
    }
}

impl Default for CurrencyTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CurrencyTool {
    fn name(&self) -> &str {
        "currency"
    }

    fn description(&self) -> &str {
        "Convert an amount between currencies at today's rate."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "amount": { "type": "number", "description": "Amount to convert." },
                "from": { "type": "string", "description": "ISO code, e.g. 'USD'." },
                "to": { "type": "string", "description": "ISO code, e.g. 'UAH'." }
            },
            "required": ["amount", "from", "to"]
        })
    }

    async fn execute(&self, input: serde_json::Value, _ctx: &RequestContext) -> ToolResult {
        let amount = input.get("amount").and_then(|v| v.as_f64());
        let from = input.get("from").and_then(|v| v.as_str());
        let to = input.get("to").and_then(|v| v.as_str());
        let (Some(amount), Some(from), Some(to)) = (amount, from, to) else {
            return ToolResult::error("required parameters: amount, from, to");
        };

        let from = from.trim().to_ascii_uppercase();
        let to = to.trim().to_ascii_uppercase();
        match self.convert(amount, &from, &to).await {
            Ok(line) => ToolResult::success(line),
            Err(e) => ToolResult::error(format!("currency failed: {e}")),
        }
    }
}

#[derive(Deserialize)]
struct RatesResponse {
    #[serde(default)]
    result: String,
    #[serde(default)]
    rates: std::collections::HashMap<String, f64>,
}
