// meteo-server/src/tools/mod.rs
mod weather;

pub use weather::{CurrentWeatherTool, ForecastTool, LocationTool};

use meteo_common::McpTool;
use std::sync::Arc;

use crate::gateway::WeatherGateway;

/// Create every weather tool, all sharing one gateway
pub fn weather_tools(gateway: Arc<WeatherGateway>) -> Vec<Arc<dyn McpTool>> {
    vec![
        Arc::new(CurrentWeatherTool::new(gateway.clone())),
        Arc::new(ForecastTool::new(gateway.clone())),
        Arc::new(LocationTool::new(gateway)),
    ]
}
