use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Transport startup error: {0}")]
    StartupError(String),

    #[error("Transport connection error: {0}")]
    ConnectionError(#[from] std::io::Error),

    #[error("Transport task failed: {0}")]
    TaskFailed(String),
}

/// Turns one inbound JSON-RPC message into at most one outbound message.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// `None` means nothing is sent back (notifications, cancelled calls).
    async fn handle_message(&self, message: String, client_id: String) -> Option<String>;
}

#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Serve until the peer goes away or the process is asked to stop.
    async fn serve(&self, message_handler: Arc<dyn MessageHandler>) -> Result<(), TransportError>;
}
