//! Newline-delimited JSON-RPC over stdin/stdout.
//!
//! Every inbound line is handled on its own task so a
//! `notifications/cancelled` can reach a call that is still running. A single
//! writer task owns the output, one message per line.

use crate::transport::traits::{McpTransport, MessageHandler, TransportError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{info, warn};

const STDIO_CLIENT_ID: &str = "stdio";

#[derive(Debug, Default)]
pub struct StdioTransport;

impl StdioTransport {
    pub fn new() -> Self {
        Self
    }

    /// Pump messages from `reader` through the handler into `writer` until EOF.
    pub async fn run<R, W>(
        reader: R,
        writer: W,
        message_handler: Arc<dyn MessageHandler>,
    ) -> Result<(), TransportError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(message) = rx.recv().await {
                writer.write_all(message.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Ok::<(), std::io::Error>(())
        });

        let mut lines = BufReader::new(reader).lines();
        let mut in_flight = JoinSet::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let handler = message_handler.clone();
            let tx = tx.clone();
            in_flight.spawn(async move {
                if let Some(response) = handler.handle_message(line, STDIO_CLIENT_ID.to_string()).await {
                    if tx.send(response).is_err() {
                        warn!("stdout writer gone, dropping response");
                    }
                }
            });
        }

        info!("stdin closed, waiting for {} in-flight request(s)", in_flight.len());
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                warn!("Request task failed: {}", e);
            }
        }
        drop(tx);

        match writer_task.await {
            Ok(result) => result.map_err(TransportError::from),
            Err(e) => Err(TransportError::TaskFailed(e.to_string())),
        }
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn serve(&self, message_handler: Arc<dyn MessageHandler>) -> Result<(), TransportError> {
        info!("Serving MCP over stdio");
        Self::run(tokio::io::stdin(), tokio::io::stdout(), message_handler).await?;
        info!("stdio transport shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    struct Echo;

    #[async_trait]
    impl MessageHandler for Echo {
        async fn handle_message(&self, message: String, client_id: String) -> Option<String> {
            if message == "quiet" {
                None
            } else {
                Some(format!("{}:{}", client_id, message))
            }
        }
    }

    #[tokio::test]
    async fn test_round_trip_over_pipe() {
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        let (mut client_read, mut client_write) = tokio::io::split(client);

        let serving = tokio::spawn(StdioTransport::run(server_read, server_write, Arc::new(Echo)));

        client_write.write_all(b"one\n\n   \nquiet\ntwo\n").await.unwrap();
        client_write.shutdown().await.unwrap();

        let mut output = String::new();
        client_read.read_to_string(&mut output).await.unwrap();
        serving.await.unwrap().unwrap();

        let mut lines: Vec<&str> = output.lines().collect();
        lines.sort_unstable();
        assert_eq!(lines, vec!["stdio:one", "stdio:two"]);
    }
}
