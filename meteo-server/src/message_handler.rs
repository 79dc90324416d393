// meteo-server/src/message_handler.rs

use async_trait::async_trait;
use meteo_common::{
    CallToolParams, CallToolResult, CancelledParams, EmptyResult, Implementation,
    InitializeParams, InitializeResult, ListToolsResult, McpRequest, McpResponse,
    ServerCapabilities, ToolError, ToolsCapability, INTERNAL_ERROR, INVALID_PARAMS,
    INVALID_REQUEST, JSONRPC_VERSION, LATEST_MCP_VERSION, METHOD_NOT_FOUND, PARSE_ERROR,
    SUPPORTED_MCP_VERSIONS,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::SERVER_NAME;
use crate::tool_registry::ToolRegistry;
use crate::transport::MessageHandler;

const INSTRUCTIONS: &str = "Weather data from Open-Meteo. Use get_location to turn a place \
name into coordinates, then get_current_weather or get_forecast with those coordinates.";

/// Dispatches JSON-RPC messages to the tool registry.
pub struct McpMessageHandler {
    registry: Arc<ToolRegistry>,
    server_info: Implementation,
    in_flight: RwLock<HashMap<String, Vec<InFlight>>>,
    next_call: AtomicU64,
}

/// A running `tools/call`. `call` tells apart calls that share a request id.
struct InFlight {
    call: u64,
    cancel: CancellationToken,
}

impl McpMessageHandler {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            in_flight: RwLock::new(HashMap::new()),
            next_call: AtomicU64::new(0),
        }
    }

    /// Number of `tools/call` requests currently running
    pub async fn in_flight(&self) -> usize {
        self.in_flight.read().await.values().map(Vec::len).sum()
    }

    async fn handle_request(&self, request: McpRequest, client_id: &str) -> Option<McpResponse> {
        if request.is_notification() {
            self.handle_notification(&request, client_id).await;
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        if request.jsonrpc != JSONRPC_VERSION {
            warn!("Unsupported jsonrpc version: {}", request.jsonrpc);
            return Some(McpResponse::failure(id, INVALID_REQUEST, "Invalid Request: jsonrpc must be \"2.0\""));
        }

        info!("Processing");
        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params),
            "ping" => success(id, &EmptyResult {}),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => return self.handle_call_tool(id, request.params, client_id).await,
            _ => {
                warn!("Method not found: {}", request.method);
                McpResponse::failure(id, METHOD_NOT_FOUND, format!("Method not found: {}", request.method))
            }
        };
        Some(response)
    }

    async fn handle_notification(&self, request: &McpRequest, client_id: &str) {
        match request.method.as_str() {
            "notifications/initialized" => info!("Client {} initialized", client_id),
            "notifications/cancelled" => {
                let params = request
                    .params
                    .clone()
                    .and_then(|p| serde_json::from_value::<CancelledParams>(p).ok());
                let Some(params) = params else {
                    warn!("notifications/cancelled without a requestId");
                    return;
                };
                let key = in_flight_key(client_id, &params.request_id);
                match self.in_flight.read().await.get(&key) {
                    Some(calls) => {
                        info!(
                            "Cancelling request {} ({})",
                            params.request_id,
                            params.reason.as_deref().unwrap_or("no reason given")
                        );
                        calls.iter().for_each(|running| running.cancel.cancel());
                    }
                    None => debug!("Cancel for unknown or finished request {}", params.request_id),
                }
            }
            other => debug!("Ignoring notification {}", other),
        }
    }

    fn handle_initialize(&self, id: Value, params: Option<Value>) -> McpResponse {
        let params = params.and_then(|p| serde_json::from_value::<InitializeParams>(p).ok());

        let protocol_version = match &params {
            Some(p) if SUPPORTED_MCP_VERSIONS.contains(&p.protocol_version.as_str()) => {
                p.protocol_version.clone()
            }
            Some(p) => {
                warn!(
                    "Client asked for protocol {}, offering {}",
                    p.protocol_version, LATEST_MCP_VERSION
                );
                LATEST_MCP_VERSION.to_string()
            }
            None => LATEST_MCP_VERSION.to_string(),
        };

        if let Some(client) = params.as_ref().and_then(|p| p.client_info.as_ref()) {
            info!("Initializing session for {} {}", client.name, client.version);
        }

        let result = InitializeResult {
            protocol_version,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
                experimental: None,
            },
            server_info: self.server_info.clone(),
            instructions: Some(INSTRUCTIONS.to_string()),
        };
        success(id, &result)
    }

    fn handle_list_tools(&self, id: Value) -> McpResponse {
        let result = ListToolsResult { tools: self.registry.list_tools(), next_cursor: None };
        success(id, &result)
    }

    async fn handle_call_tool(&self, id: Value, params: Option<Value>, client_id: &str) -> Option<McpResponse> {
        let params = match params.map(serde_json::from_value::<CallToolParams>) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return Some(McpResponse::failure(id, INVALID_PARAMS, format!("Invalid params for tools/call: {}", e)))
            }
            None => return Some(McpResponse::failure(id, INVALID_PARAMS, "Invalid params for tools/call")),
        };
        let arguments = params.arguments.unwrap_or_else(|| json!({}));

        let key = in_flight_key(client_id, &id);
        let call = self.next_call.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        {
            let mut in_flight = self.in_flight.write().await;
            let calls = in_flight.entry(key.clone()).or_default();
            if !calls.is_empty() {
                warn!("Request id {} reused while {} call(s) still running", id, calls.len());
            }
            calls.push(InFlight { call, cancel: cancel.clone() });
        }

        let outcome = self.registry.call_tool(&params.name, &arguments, &cancel).await;

        {
            let mut in_flight = self.in_flight.write().await;
            if let Some(calls) = in_flight.get_mut(&key) {
                calls.retain(|running| running.call != call);
                if calls.is_empty() {
                    in_flight.remove(&key);
                }
            }
        }
        if cancel.is_cancelled() {
            info!("Request {} was cancelled, dropping its response", id);
            return None;
        }

        let response = match outcome {
            Ok(text) => success(id, &CallToolResult::text(text)),
            Err(ToolError::NotFound(name)) => {
                warn!("Unknown tool: {}", name);
                McpResponse::failure(id, INVALID_PARAMS, format!("Unknown tool: {}", name))
            }
            Err(e @ ToolError::InvalidArguments { .. }) => {
                warn!("{}", e);
                success(id, &CallToolResult::error(e.to_string()))
            }
        };
        Some(response)
    }
}

#[async_trait]
impl MessageHandler for McpMessageHandler {
    async fn handle_message(&self, message: String, client_id: String) -> Option<String> {
        let value: Value = match serde_json::from_str(&message) {
            Ok(value) => value,
            Err(e) => {
                error!("Parse error: {}", e);
                return encode(McpResponse::failure(Value::Null, PARSE_ERROR, format!("Parse error: {}", e)));
            }
        };

        if value.get("method").is_none() && (value.get("result").is_some() || value.get("error").is_some()) {
            debug!("Ignoring JSON-RPC response from client {}", client_id);
            return None;
        }

        let request = match serde_json::from_value::<McpRequest>(value.clone()) {
            Ok(request) => request,
            Err(e) => {
                warn!("Invalid request from {}: {}", client_id, e);
                let id = value.get("id").cloned().unwrap_or(Value::Null);
                return encode(McpResponse::failure(id, INVALID_REQUEST, format!("Invalid Request: {}", e)));
            }
        };

        let request_id = request.id.clone().unwrap_or(Value::Null);
        let span = info_span!(
            "mcp_request",
            client = %client_id,
            id = %request_id,
            method = %request.method
        );
        let response = self.handle_request(request, &client_id).instrument(span).await?;
        encode(response)
    }
}

fn in_flight_key(client_id: &str, request_id: &Value) -> String {
    format!("{}:{}", client_id, request_id)
}

fn success<T: Serialize>(id: Value, result: &T) -> McpResponse {
    match serde_json::to_value(result) {
        Ok(result) => McpResponse::success(id, result),
        Err(e) => McpResponse::failure(id, INTERNAL_ERROR, format!("Internal error: {}", e)),
    }
}

fn encode(response: McpResponse) -> Option<String> {
    match serde_json::to_string(&response) {
        Ok(text) => Some(text),
        Err(e) => {
            error!("Failed to encode response: {}", e);
            Some(
                json!({"jsonrpc": "2.0", "id": response.id, "error": {"code": INTERNAL_ERROR, "message": "Internal error"}})
                    .to_string(),
            )
        }
    }
}
