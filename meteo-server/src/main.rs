// meteo-server/src/main.rs

use clap::Parser;
use meteo_server::config::Cli;
use meteo_server::{transport, weather_registry, HttpFetcher, McpMessageHandler, WeatherGateway};
use std::{error::Error, sync::Arc};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    // stdout carries the protocol; logs go to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.gateway_config();
    info!(
        "Using forecast API {} and geocoding API {}",
        config.forecast_base_url, config.geocoding_base_url
    );

    let fetcher = Arc::new(HttpFetcher::new(&config)?);
    let gateway = Arc::new(WeatherGateway::new(fetcher, &config));
    let registry = Arc::new(weather_registry(gateway)?);
    info!("Registered {} tools", registry.list_tools().len());

    let message_handler = Arc::new(McpMessageHandler::new(registry));
    let transport = transport::from_cli(&cli)?;
    transport.serve(message_handler).await?;

    info!("Server shut down successfully");
    Ok(())
}
