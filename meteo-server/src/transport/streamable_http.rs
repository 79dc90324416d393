use crate::transport::traits::{McpTransport, MessageHandler, TransportError};
use async_trait::async_trait;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const MCP_SESSION_ID_HEADER: &str = "mcp-session-id";

// Structure to store session information
struct SessionInfo {
    created_at: Instant,
    last_seen: Instant,
    request_count: u64,
}

impl SessionInfo {
    fn new() -> Self {
        let now = Instant::now();
        Self { created_at: now, last_seen: now, request_count: 1 }
    }

    fn touch(&mut self) {
        self.last_seen = Instant::now();
        self.request_count += 1;
    }
}

#[derive(Clone)]
struct HttpState {
    message_handler: Arc<dyn MessageHandler>,
    sessions: Arc<RwLock<HashMap<String, SessionInfo>>>,
    idle_timeout: Duration,
}

impl HttpState {
    /// Drop sessions not seen within `idle_timeout`.
    async fn expire_idle(&self) {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, info| info.last_seen.elapsed() < self.idle_timeout);
        let expired = before - sessions.len();
        if expired > 0 {
            info!("Expired {} idle session(s), {} active", expired, sessions.len());
        }
    }
}

pub struct StreamableHttpTransport {
    addr: SocketAddr,
    idle_timeout: Duration,
}

impl StreamableHttpTransport {
    pub fn new(addr: SocketAddr, idle_timeout: Duration) -> Self {
        Self { addr, idle_timeout }
    }

    /// Routes for `/mcp`, usable without binding a socket.
    pub fn router(message_handler: Arc<dyn MessageHandler>, idle_timeout: Duration) -> Router {
        let state = HttpState {
            message_handler,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        };

        Router::new()
            .route("/mcp", get(handle_get).post(handle_post).delete(handle_delete))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }
}

#[async_trait]
impl McpTransport for StreamableHttpTransport {
    async fn serve(&self, message_handler: Arc<dyn MessageHandler>) -> Result<(), TransportError> {
        let app = Self::router(message_handler, self.idle_timeout);

        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| TransportError::StartupError(format!("Cannot bind {}: {}", self.addr, e)))?;
        info!("Streamable HTTP transport listening on {}", self.addr);

        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Streamable HTTP transport shut down");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received..."),
        Err(e) => {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(MCP_SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn is_initialize(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("method").and_then(Value::as_str).map(|m| m == "initialize"))
        .unwrap_or(false)
}

// Handle HTTP POST requests (client to server)
async fn handle_post(State(state): State<HttpState>, headers: HeaderMap, body: String) -> Response {
    let session = session_id(&headers);
    state.expire_idle().await;

    if let Some(ref id) = session {
        let mut sessions = state.sessions.write().await;
        match sessions.get_mut(id) {
            Some(info) => info.touch(),
            None => {
                warn!("POST /mcp for non-existent session: {}", id);
                return (StatusCode::NOT_FOUND, "Session not found").into_response();
            }
        }
    }

    let initializing = is_initialize(&body);
    let client_id = session
        .clone()
        .unwrap_or_else(|| format!("http-{}", Uuid::new_v4()));

    match state.message_handler.handle_message(body, client_id).await {
        Some(response) if initializing => {
            // Re-initializing an existing session keeps its id
            let session_id = match session {
                Some(id) => id,
                None => {
                    let new_id = Uuid::new_v4().to_string();
                    state.sessions.write().await.insert(new_id.clone(), SessionInfo::new());
                    info!("Created session {}", new_id);
                    new_id
                }
            };
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE.as_str(), "application/json"),
                    (MCP_SESSION_ID_HEADER, session_id.as_str()),
                ],
                response,
            )
                .into_response()
        }
        Some(response) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], response).into_response()
        }
        None => StatusCode::ACCEPTED.into_response(),
    }
}

// No server-initiated stream is offered
async fn handle_get() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "POST, DELETE")]).into_response()
}

async fn handle_delete(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let Some(id) = session_id(&headers) else {
        warn!("DELETE /mcp missing mcp-session-id");
        return (StatusCode::BAD_REQUEST, "mcp-session-id header required").into_response();
    };

    match state.sessions.write().await.remove(&id) {
        Some(info) => {
            info!(
                "Session {} terminated after {} request(s), {:?} old",
                id,
                info.request_count,
                info.created_at.elapsed()
            );
            (StatusCode::OK, "Session terminated").into_response()
        }
        None => {
            warn!("DELETE /mcp for non-existent session: {}", id);
            (StatusCode::NOT_FOUND, "Session not found").into_response()
        }
    }
}
