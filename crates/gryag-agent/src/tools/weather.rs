//! Current-weather lookup via the Open-Meteo public API (no key needed).

use async_trait::async_trait;
use serde::Deserialize;

use crate::request::RequestContext;

use super::{Tool, ToolResult};

const GEOCODE_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

pub struct WeatherTool {
    client: reqwest::Client,
}

impl WeatherTool {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn lookup(&self, city: &str) -> Result<String, String> {
        let geo: GeocodeResponse = self
            .client
            .get(GEOCODE_URL)
            .query(&[("name", city), ("count", "1")])
            .send()
            .await
            .map_err(|e| format!("geocoding request failed: {e}"))?
            .json()
            .await
            .map_err(|e| format!("geocoding response invalid: {e}"))?;

        let place = geo
            .results
            .into_iter()
            .next()
            .ok_or_else(|| format!("no such place: {city}"))?;

        let weather: ForecastResponse = self
            .client
            .get(FORECAST_URL)
            .query(&[
                ("latitude", place.latitude.to_string()),
                ("longitude", place.longitude.to_string()),
                ("current_weather", "true".to_string()),
            ])
            .send()
            .await
            .map_err(|e| format!("forecast request failed: {e}"))?
            .json()
            .await
            .map_err(|e| format!("forecast response invalid: {e}"))?;

        let cw = weather
            .current_weather
            .ok_or_else(|| "no current weather in response".to_string())?;
        Ok(format!(
            "{}, {}: {}°C, wind {} km/h",
            place.name, place.country, cw.temperature, cw.windspeed
        ))
    }
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "weather"
    }

    fn description(&self) -> &str {
        "Get the current weather for a city."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "City name, e.g. 'Kyiv' or 'Lviv'."
                }
            },
            "required": ["city"]
        })
    }

    async fn execute(&self, input: serde_json::Value, _ctx: &RequestContext) -> ToolResult {
        let city = match input.get("city").and_then(|v| v.as_str()) {
            Some(c) if !c.trim().is_empty() => c.trim(),
            _ => return ToolResult::error("missing required parameter: city"),
        };
        match self.lookup(city).await {
            Ok(report) => ToolResult::success(report),
            Err(e) => ToolResult::error(format!("weather failed: {e}")),
        }
    }
}

#[derive(Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeHit>,
}

#[derive(Deserialize)]
struct GeocodeHit {
    name: String,
    #[serde(default)]
    country: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct ForecastResponse {
    current_weather: Option<CurrentWeather>,
}

#[derive(Deserialize)]
struct CurrentWeather {
    temperature: f64,
    windspeed: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_city_is_error() {
        let ctx = RequestContext::new("req", -1, None, None, "");
        let result = WeatherTool::new().execute(serde_json::json!({}), &ctx).await;
        assert!(result.is_error);
    }
}
