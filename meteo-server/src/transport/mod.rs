pub mod traits;
mod stdio;
mod streamable_http;

pub use traits::{MessageHandler, McpTransport, TransportError};
pub use stdio::StdioTransport;
pub use streamable_http::StreamableHttpTransport;

use std::net::SocketAddr;
use std::time::Duration;

use crate::config::{Cli, TransportKind};

/// Build the transport selected on the command line
pub fn from_cli(cli: &Cli) -> Result<Box<dyn McpTransport>, TransportError> {
    match cli.transport {
        TransportKind::Stdio => Ok(Box::new(StdioTransport::new())),
        TransportKind::Http => {
            let addr: SocketAddr = format!("{}:{}", cli.host, cli.port)
                .parse()
                .map_err(|e| TransportError::StartupError(format!("Invalid listen address: {}", e)))?;
            Ok(Box::new(StreamableHttpTransport::new(
                addr,
                Duration::from_secs(cli.session_idle_secs),
            )))
        }
    }
}
