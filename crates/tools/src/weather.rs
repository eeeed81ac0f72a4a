//! Weather tool: current conditions for a location named in the query.
//!
//! With an OpenWeatherMap key it calls the live API; without one it returns
//! deterministic mock data derived from the location name, so the pipeline
//! runs end-to-end offline.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use ragline_core::error::ToolError;
use ragline_core::tool::{Tool, ToolResult};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

static LOCATION_AFTER_PREPOSITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:weather|temperature|forecast)\b.*?\b(?:in|for|at)\s+([a-z][a-z\s,]*)")
        .expect("location regex is valid")
});
static LOCATION_AFTER_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bweather\s+(?:in\s+)?([a-z][a-z\s,]*)").expect("location regex is valid")
});

const TRAILING_FILLER: &[&str] = &[
    "today", "tomorrow", "now", "right", "please", "currently", "tonight", "like",
];

const NO_LOCATION: &str =
    "Location not found in query. Please specify a location like \"weather in London\"";

/// Normalized weather report, shared by the live and mock paths.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub location: String,
    pub condition: String,
    /// Degrees Celsius
    pub temperature: f64,
    /// Percent
    pub humidity: u32,
    /// km/h
    pub wind_speed: f64,
    pub description: String,
    /// `"openweathermap"` or `"mock"`
    pub source: String,
}

pub struct WeatherTool {
    api_key: Option<String>,
    api_url: String,
    client: reqwest::Client,
}

impl WeatherTool {
    /// A tool that calls `api_url` when `api_key` is set and falls back to
    /// mock data otherwise.
    pub fn new(
        api_key: Option<String>,
        api_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "weather".into(),
                reason: format!("HTTP client: {e}"),
            })?;
        Ok(Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            api_url: api_url.into(),
            client,
        })
    }

    /// Mock-only tool.
    pub fn offline() -> Self {
        Self {
            api_key: None,
            api_url: String::new(),
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_live(&self, location: &str, api_key: &str) -> Result<WeatherReport, String> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("q", location), ("appid", api_key), ("units", "metric")])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("weather API returned {status}"));
        }

        let body: OwmResponse = response.json().await.map_err(|e| e.to_string())?;
        Ok(body.into_report(location))
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "weather"
    }

    fn description(&self) -> &str {
        "Get weather information for a location"
    }

    async fn execute(&self, query: &str) -> ToolResult {
        let Some(location) = extract_location(query) else {
            return ToolResult::failure(NO_LOCATION);
        };

        let report = match &self.api_key {
            Some(key) => match self.fetch_live(&location, key).await {
                Ok(report) => report,
                Err(e) => {
                    warn!(%location, error = %e, "Weather lookup failed");
                    return ToolResult::failure("Failed to get weather information");
                }
            },
            None => mock_weather(&location),
        };

        debug!(%location, source = %report.source, "Weather report ready");
        match serde_json::to_value(&report) {
            Ok(data) => ToolResult::ok(data),
            Err(e) => ToolResult::failure(format!("Failed to encode weather report: {e}")),
        }
    }
}

/// Find the place name in a weather question.
pub fn extract_location(query: &str) -> Option<String> {
    let captured = LOCATION_AFTER_PREPOSITION_RE
        .captures(query)
        .or_else(|| LOCATION_AFTER_KEYWORD_RE.captures(query))?
        .get(1)?
        .as_str();

    let mut words: Vec<&str> = captured.split_whitespace().collect();
    while let Some(last) = words.last() {
        let bare = last.trim_matches(',').to_ascii_lowercase();
        if bare.is_empty() || TRAILING_FILLER.contains(&bare.as_str()) {
            words.pop();
        } else {
            break;
        }
    }

    let location = words.join(" ").trim_end_matches(',').trim().to_string();
    (!location.is_empty()).then_some(location)
}

/// Deterministic mock weather based on a hash of the location name.
pub fn mock_weather(location: &str) -> WeatherReport {
    let hash: u32 = location
        .to_lowercase()
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));

    let conditions = ["Sunny", "Cloudy", "Rainy", "Partly Cloudy", "Clear"];
    let condition = conditions[(hash as usize / 7) % conditions.len()];
    let temperature = f64::from(10 + hash % 30);

    WeatherReport {
        location: location.to_string(),
        condition: condition.to_string(),
        temperature,
        humidity: 40 + (hash / 3) % 40,
        wind_speed: f64::from(5 + (hash / 11) % 20),
        description: format!(
            "{condition} weather in {location} with temperature around {temperature}°C"
        ),
        source: "mock".into(),
    }
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    #[serde(default)]
    name: Option<String>,
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    #[serde(default)]
    wind: Option<OwmWind>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    #[serde(default)]
    humidity: u32,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    #[serde(default)]
    speed: f64,
}

impl OwmResponse {
    fn into_report(self, requested: &str) -> WeatherReport {
        let location = self
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| requested.to_string());
        let (condition, detail) = self
            .weather
            .into_iter()
            .next()
            .map(|w| (w.main, w.description))
            .unwrap_or_else(|| ("Unknown".into(), String::new()));
        // m/s to km/h
        let wind_speed = self.wind.map(|w| (w.speed * 3.6 * 10.0).round() / 10.0).unwrap_or(0.0);
        let temperature = (self.main.temp * 10.0).round() / 10.0;
        let detail = if detail.is_empty() { condition.to_lowercase() } else { detail };

        WeatherReport {
            description: format!("{detail} in {location}, {temperature}°C"),
            location,
            condition,
            temperature,
            humidity: self.main.humidity,
            wind_speed,
            source: "openweathermap".into(),
        }
    }
}
