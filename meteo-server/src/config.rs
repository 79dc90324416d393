// meteo-server/src/config.rs

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::time::Duration;

// --- Constants ---
pub const OPENMETEO_API_BASE: &str = "https://api.open-meteo.com/v1";
pub const GEOCODING_API_BASE: &str = "https://geocoding-api.open-meteo.com/v1";
pub const USER_AGENT: &str = "weather-app/1.0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 1800;

/// Name announced in `serverInfo`.
pub const SERVER_NAME: &str = "weather";

/// Settings for the upstream Open-Meteo requests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayConfig {
    /// Forecast API base, without the trailing `/forecast`
    #[serde(default = "default_forecast_base_url")]
    pub forecast_base_url: String,

    /// Geocoding API base, without the trailing `/search`
    #[serde(default = "default_geocoding_base_url")]
    pub geocoding_base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_forecast_base_url() -> String {
    OPENMETEO_API_BASE.to_string()
}

fn default_geocoding_base_url() -> String {
    GEOCODING_API_BASE.to_string()
}

fn default_user_agent() -> String {
    USER_AGENT.to_string()
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            forecast_base_url: default_forecast_base_url(),
            geocoding_base_url: default_geocoding_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    /// Newline-delimited JSON-RPC over stdin/stdout
    Stdio,
    /// Streamable HTTP on /mcp
    Http,
}

/// Open-Meteo weather tools over the Model Context Protocol
#[derive(Parser, Debug)]
#[command(name = "meteo-server", author, version, about, long_about = None)]
pub struct Cli {
    #[arg(long, value_enum, env = "METEO_TRANSPORT", default_value = "stdio")]
    pub transport: TransportKind,

    #[arg(long, env = "METEO_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    #[arg(short, long, env = "METEO_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    #[arg(long, env = "METEO_FORECAST_BASE_URL", default_value = OPENMETEO_API_BASE)]
    pub forecast_base_url: String,

    #[arg(long, env = "METEO_GEOCODING_BASE_URL", default_value = GEOCODING_API_BASE)]
    pub geocoding_base_url: String,

    #[arg(long, env = "METEO_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// HTTP sessions idle this long are dropped
    #[arg(long, env = "METEO_SESSION_IDLE_SECS", default_value_t = DEFAULT_SESSION_IDLE_SECS)]
    pub session_idle_secs: u64,

    /// Fallback filter when RUST_LOG is unset
    #[arg(long, env = "METEO_LOG", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            forecast_base_url: self.forecast_base_url.trim_end_matches('/').to_string(),
            geocoding_base_url: self.geocoding_base_url.trim_end_matches('/').to_string(),
            user_agent: USER_AGENT.to_string(),
            timeout_secs: self.timeout_secs,
        }
    }
}
