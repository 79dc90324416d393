//! The three weather operations.
//!
//! Each one validates its input, builds an Open-Meteo URL, fetches it once
//! and returns either the upstream payload (pretty-printed, untouched) or an
//! `{"error": ...}` envelope. Every path returns a JSON string.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use url::Url;

use crate::config::GatewayConfig;
use crate::error::{ErrorKind, FetchFault, GatewayError};
use crate::fetch::{JsonFetcher, Upstream};

/// Variables requested by `get_current_weather`.
pub const CURRENT_WEATHER_FIELDS: [&str; 15] = [
    "temperature_2m",
    "is_day",
    "showers",
    "cloud_cover",
    "wind_speed_10m",
    "wind_direction_10m",
    "pressure_msl",
    "snowfall",
    "precipitation",
    "relative_humidity_2m",
    "apparent_temperature",
    "rain",
    "weather_code",
    "surface_pressure",
    "wind_gusts_10m",
];

/// Variables requested by `get_forecast`.
pub const DAILY_FORECAST_FIELDS: [&str; 5] = [
    "temperature_2m_max",
    "temperature_2m_min",
    "precipitation_sum",
    "wind_speed_10m_max",
    "weather_code",
];

pub const MIN_FORECAST_DAYS: i64 = 1;
pub const MAX_FORECAST_DAYS: i64 = 16;
pub const DEFAULT_FORECAST_DAYS: i64 = 7;

pub const GEOCODING_RESULT_COUNT: u32 = 5;
pub const GEOCODING_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CurrentWeather,
    Forecast,
    Location,
}

impl Operation {
    pub fn tool_name(self) -> &'static str {
        match self {
            Operation::CurrentWeather => "get_current_weather",
            Operation::Forecast => "get_forecast",
            Operation::Location => "get_location",
        }
    }

    pub fn unavailable_message(self) -> &'static str {
        match self {
            Operation::CurrentWeather => "Unable to fetch current weather data for this location.",
            Operation::Forecast => "Unable to fetch forecast data for this location.",
            Operation::Location => "Unable to search for locations.",
        }
    }

    pub fn fault_prefix(self) -> &'static str {
        match self {
            Operation::CurrentWeather => "Error fetching weather data",
            Operation::Forecast => "Error fetching forecast data",
            Operation::Location => "Error searching for location",
        }
    }
}

/// Clamp a requested forecast window to what Open-Meteo serves.
pub fn clamp_forecast_days(days: i64) -> i64 {
    days.clamp(MIN_FORECAST_DAYS, MAX_FORECAST_DAYS)
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), GatewayError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(GatewayError::InvalidLatitude);
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(GatewayError::InvalidLongitude);
    }
    Ok(())
}

pub struct WeatherGateway {
    fetcher: Arc<dyn JsonFetcher>,
    forecast_base_url: String,
    geocoding_base_url: String,
}

impl WeatherGateway {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, config: &GatewayConfig) -> Self {
        Self {
            fetcher,
            forecast_base_url: config.forecast_base_url.clone(),
            geocoding_base_url: config.geocoding_base_url.clone(),
        }
    }

    pub fn current_weather_url(&self, latitude: f64, longitude: f64) -> Result<Url, FetchFault> {
        let mut url = Url::parse(&format!("{}/forecast", self.forecast_base_url))?;
        url.query_pairs_mut()
            .append_pair("latitude", &latitude.to_string())
            .append_pair("longitude", &longitude.to_string())
            .append_pair("current", &CURRENT_WEATHER_FIELDS.join(","));
        Ok(url)
    }

    /// `days` must already be clamped.
    pub fn forecast_url(&self, latitude: f64, longitude: f64, days: i64) -> Result<Url, FetchFault> {
        let mut url = Url::parse(&format!("{}/forecast", self.forecast_base_url))?;
        url.query_pairs_mut()
            .append_pair("latitude", &latitude.to_string())
            .append_pair("longitude", &longitude.to_string())
            .append_pair("daily", &DAILY_FORECAST_FIELDS.join(","))
            .append_pair("forecast_days", &days.to_string());
        Ok(url)
    }

    pub fn location_url(&self, name: &str) -> Result<Url, FetchFault> {
        let mut url = Url::parse(&format!("{}/search", self.geocoding_base_url))?;
        url.query_pairs_mut()
            .append_pair("name", name)
            .append_pair("count", &GEOCODING_RESULT_COUNT.to_string())
            .append_pair("language", GEOCODING_LANGUAGE)
            .append_pair("format", "json");
        Ok(url)
    }

    /// Current conditions at a coordinate.
    pub async fn get_current_weather(
        &self,
        latitude: f64,
        longitude: f64,
        cancel: &CancellationToken,
    ) -> String {
        let op = Operation::CurrentWeather;
        let outcome = match validate_coordinates(latitude, longitude) {
            Ok(()) => self.run(op, self.current_weather_url(latitude, longitude), cancel).await,
            Err(e) => Err(e),
        };
        Self::render(op, outcome)
    }

    /// Daily forecast; `days` is silently clamped to 1..=16.
    pub async fn get_forecast(
        &self,
        latitude: f64,
        longitude: f64,
        days: i64,
        cancel: &CancellationToken,
    ) -> String {
        let op = Operation::Forecast;
        let outcome = match validate_coordinates(latitude, longitude) {
            Ok(()) => {
                let forecast_days = clamp_forecast_days(days);
                self.run(op, self.forecast_url(latitude, longitude, forecast_days), cancel).await
            }
            Err(e) => Err(e),
        };
        Self::render(op, outcome)
    }

    /// Geocode a place name into candidate locations.
    pub async fn get_location(&self, name: &str, cancel: &CancellationToken) -> String {
        let op = Operation::Location;
        let outcome = if name.trim().is_empty() {
            Err(GatewayError::EmptyLocationName)
        } else {
            self.run(op, self.location_url(name), cancel).await
        };
        Self::render(op, outcome)
    }

    async fn run(
        &self,
        op: Operation,
        url: Result<Url, FetchFault>,
        cancel: &CancellationToken,
    ) -> Result<String, GatewayError> {
        let fault = |source| GatewayError::Fault { operation: op, source };

        let url = url.map_err(fault)?;
        match self.fetcher.fetch_json(&url, cancel).await.map_err(fault)? {
            Upstream::Payload(payload) => {
                serde_json::to_string_pretty(&payload).map_err(|e| fault(e.into()))
            }
            Upstream::Absent => Err(GatewayError::Unavailable(op)),
        }
    }

    fn render(op: Operation, outcome: Result<String, GatewayError>) -> String {
        match outcome {
            Ok(body) => {
                info!(tool = op.tool_name(), bytes = body.len(), "Upstream payload returned");
                body
            }
            Err(e) => {
                match e.kind() {
                    ErrorKind::InvalidInput => warn!(tool = op.tool_name(), "Rejected input: {}", e),
                    ErrorKind::Unavailable => warn!(tool = op.tool_name(), "No upstream data"),
                    ErrorKind::Internal => error!("Error in {}: {}", op.tool_name(), e),
                }
                e.to_envelope()
            }
        }
    }
}
