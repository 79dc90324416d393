// meteo-server/src/tool_registry.rs

use meteo_common::{McpTool, Tool, ToolError, ToolResult};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Registry that manages all available tools, keyed (and listed) by name
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn McpTool>>,
}

impl ToolRegistry {
    /// Create a new, empty tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool with the registry
    pub fn register_tool(&mut self, tool: Arc<dyn McpTool>) -> Result<(), String> {
        let name = tool.name().to_string();

        if self.tools.contains_key(&name) {
            return Err(format!("Tool '{}' is already registered", name));
        }

        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn McpTool>> {
        self.tools.get(name).cloned()
    }

    /// Describe all registered tools for `tools/list`
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.values().map(|tool| tool.describe()).collect()
    }

    /// Execute a tool by name
    pub async fn call_tool(&self, name: &str, arguments: &Value, cancel: &CancellationToken) -> ToolResult {
        match self.get_tool(name) {
            Some(tool) => tool.call(arguments, cancel).await,
            None => Err(ToolError::NotFound(name.to_string())),
        }
    }
}
