//! Open-Meteo weather tools served over the Model Context Protocol.
//!
//! Three tools (`get_current_weather`, `get_forecast`, `get_location`) pass
//! Open-Meteo responses straight through to the client, or answer with an
//! `{"error": ...}` envelope.

pub mod config;
pub mod error;
pub mod fetch;
pub mod gateway;
pub mod message_handler;
pub mod tool_registry;
pub mod tools;
pub mod transport;

pub use config::GatewayConfig;
pub use error::{FetchFault, GatewayError};
pub use fetch::{HttpFetcher, JsonFetcher, Upstream};
pub use gateway::WeatherGateway;
pub use message_handler::McpMessageHandler;
pub use tool_registry::ToolRegistry;

use std::sync::Arc;

/// Registry holding the three weather tools, all backed by `gateway`.
pub fn weather_registry(gateway: Arc<WeatherGateway>) -> Result<ToolRegistry, String> {
    let mut registry = ToolRegistry::new();
    for tool in tools::weather_tools(gateway) {
        registry.register_tool(tool)?;
    }
    Ok(registry)
}
