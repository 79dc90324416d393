// meteo-server/src/tools/weather.rs
use async_trait::async_trait;
use meteo_common::{McpTool, ToolAnnotations, ToolError, ToolResult};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{json, Number, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::gateway::{Operation, WeatherGateway, DEFAULT_FORECAST_DAYS};

#[derive(Debug, Deserialize)]
struct CoordinateArgs {
    latitude: f64,
    longitude: f64,
}

fn default_days() -> i64 {
    DEFAULT_FORECAST_DAYS
}

#[derive(Debug, Deserialize)]
struct ForecastArgs {
    latitude: f64,
    longitude: f64,
    #[serde(default = "default_days", deserialize_with = "whole_number")]
    days: i64,
}

/// Integer, or a float with no fractional part (`5.0`).
fn whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let n = Number::deserialize(deserializer)?;
    if let Some(i) = n.as_i64() {
        return Ok(i);
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => Ok(f as i64),
        _ => Err(de::Error::custom(format!("expected a whole number, got {}", n))),
    }
}

#[derive(Debug, Deserialize)]
struct LocationArgs {
    name: String,
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: &Value) -> Result<T, ToolError> {
    T::deserialize(arguments).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

fn read_only() -> ToolAnnotations {
    ToolAnnotations {
        title: None,
        read_only_hint: Some(true),
        destructive_hint: Some(false),
        idempotent_hint: Some(true),
        open_world_hint: Some(true),
    }
}

fn coordinate_properties() -> Value {
    json!({
        "latitude": {
            "type": "number",
            "minimum": -90,
            "maximum": 90,
            "description": "Latitude of the location"
        },
        "longitude": {
            "type": "number",
            "minimum": -180,
            "maximum": 180,
            "description": "Longitude of the location"
        }
    })
}

/// `get_current_weather`
pub struct CurrentWeatherTool {
    gateway: Arc<WeatherGateway>,
}

impl CurrentWeatherTool {
    pub fn new(gateway: Arc<WeatherGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl McpTool for CurrentWeatherTool {
    fn name(&self) -> &str {
        Operation::CurrentWeather.tool_name()
    }

    fn description(&self) -> &str {
        "Get current weather for a location."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": coordinate_properties(),
            "required": ["latitude", "longitude"]
        })
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations { title: Some("Current weather".into()), ..read_only() })
    }

    async fn call(&self, arguments: &Value, cancel: &CancellationToken) -> ToolResult {
        let args: CoordinateArgs = parse_args(self.name(), arguments)?;
        info!("Fetching current weather for ({}, {})", args.latitude, args.longitude);
        Ok(self.gateway.get_current_weather(args.latitude, args.longitude, cancel).await)
    }
}

/// `get_forecast`
pub struct ForecastTool {
    gateway: Arc<WeatherGateway>,
}

impl ForecastTool {
    pub fn new(gateway: Arc<WeatherGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl McpTool for ForecastTool {
    fn name(&self) -> &str {
        Operation::Forecast.tool_name()
    }

    fn description(&self) -> &str {
        "Get weather forecast for a location."
    }

    fn input_schema(&self) -> Value {
        let mut properties = coordinate_properties();
        properties["days"] = json!({
            "type": "integer",
            "default": DEFAULT_FORECAST_DAYS,
            "description": "Number of forecast days (1-16, default 7)"
        });
        json!({
            "type": "object",
            "properties": properties,
            "required": ["latitude", "longitude"]
        })
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations { title: Some("Weather forecast".into()), ..read_only() })
    }

    async fn call(&self, arguments: &Value, cancel: &CancellationToken) -> ToolResult {
        let args: ForecastArgs = parse_args(self.name(), arguments)?;
        info!(
            "Fetching {}-day forecast for ({}, {})",
            args.days, args.latitude, args.longitude
        );
        Ok(self
            .gateway
            .get_forecast(args.latitude, args.longitude, args.days, cancel)
            .await)
    }
}

/// `get_location`
pub struct LocationTool {
    gateway: Arc<WeatherGateway>,
}

impl LocationTool {
    pub fn new(gateway: Arc<WeatherGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl McpTool for LocationTool {
    fn name(&self) -> &str {
        Operation::Location.tool_name()
    }

    fn description(&self) -> &str {
        "Search for locations by name to get coordinates."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Name of the city or location to search for"
                }
            },
            "required": ["name"]
        })
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations { title: Some("Location search".into()), ..read_only() })
    }

    async fn call(&self, arguments: &Value, cancel: &CancellationToken) -> ToolResult {
        let args: LocationArgs = parse_args(self.name(), arguments)?;
        info!("Searching locations for {:?}", args.name);
        Ok(self.gateway.get_location(&args.name, cancel).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forecast_days_default() {
        let args: ForecastArgs =
            parse_args("get_forecast", &json!({"latitude": 1.0, "longitude": 2.0})).unwrap();
        assert_eq!(args.days, 7);
    }

    #[test]
    fn test_integer_coordinates_accepted() {
        let args: CoordinateArgs =
            parse_args("get_current_weather", &json!({"latitude": 52, "longitude": 13})).unwrap();
        assert_eq!(args.latitude, 52.0);
        assert_eq!(args.longitude, 13.0);
    }

    #[test]
    fn test_missing_argument_is_rejected() {
        let err = parse_args::<CoordinateArgs>("get_current_weather", &json!({"latitude": 1.0}))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Invalid arguments for get_current_weather"), "{message}");
        assert!(message.contains("longitude"), "{message}");
    }

    #[test]
    fn test_whole_float_days_accepted() {
        let args: ForecastArgs = parse_args(
            "get_forecast",
            &json!({"latitude": 1.0, "longitude": 2.0, "days": 5.0}),
        )
        .unwrap();
        assert_eq!(args.days, 5);

        let err = parse_args::<ForecastArgs>(
            "get_forecast",
            &json!({"latitude": 1.0, "longitude": 2.0, "days": 2.5}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("whole number"), "{err}");
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        assert!(parse_args::<LocationArgs>("get_location", &json!({"name": 5})).is_err());
        assert!(parse_args::<ForecastArgs>(
            "get_forecast",
            &json!({"latitude": 1.0, "longitude": 2.0, "days": "many"})
        )
        .is_err());
    }
}
