// meteo-common/src/tool.rs
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{Tool, ToolAnnotations};

/// Errors a tool reports before it gets to do any work.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

/// Result type for `tools/call`: the text the tool hands back to the client.
pub type ToolResult = Result<String, ToolError>;

/// Trait that defines the interface for every tool the server exposes
#[async_trait]
pub trait McpTool: Send + Sync {
    /// Get the unique name of this tool
    fn name(&self) -> &str;

    /// Get tool description, shown to the model
    fn description(&self) -> &str;

    /// Get the JSON schema for this tool's `arguments`
    fn input_schema(&self) -> Value;

    /// Get annotations for this tool when listed.
    /// Used for the `tools/list` response.
    fn annotations(&self) -> Option<ToolAnnotations> {
        None
    }

    /// Run the tool. `cancel` fires when the client gives up on the call.
    async fn call(&self, arguments: &Value, cancel: &CancellationToken) -> ToolResult;

    /// Describe this tool for `tools/list`
    fn describe(&self) -> Tool {
        Tool {
            name: self.name().to_string(),
            description: Some(self.description().to_string()),
            input_schema: self.input_schema(),
            annotations: self.annotations(),
        }
    }
}
