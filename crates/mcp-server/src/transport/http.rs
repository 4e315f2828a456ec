//! HTTP/SSE transport for MCP

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures::stream::{self, Stream, StreamExt};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::{RequestBodyTimeoutLayer, ResponseBodyTimeoutLayer, TimeoutLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::error::PoolError;
use crate::pool::ConnectionPool;
use crate::protocol::{
    McpError, McpRequest, McpResponse, RequestRouter, ToolCallParams, METHOD_TOOLS_CALL,
};
use crate::shutdown::{Phase, ShutdownCoordinator};
use crate::stream::{StreamDispatcher, StreamEvent};
use weave_core::CallContext;

/// Request body limit used when the configuration gives none
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 1024 * 1024;

/// Shared state for HTTP handlers
pub struct AppState {
    pub router: RequestRouter,
    pub streams: StreamDispatcher,
    pub pool: Arc<ConnectionPool>,
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Caller-side deadline applied to every tool call
    pub tool_timeout: Option<Duration>,
}

impl AppState {
    fn call_context(&self) -> CallContext {
        match self.tool_timeout {
            Some(timeout) => CallContext::with_timeout(timeout),
            None => CallContext::background(),
        }
    }
}

/// Connection timeouts; `None` leaves the corresponding limit off.
///
/// `write` bounds the whole response of `/mcp`, `/health` and `/stats`.
/// `/mcp/stream` is exempt from it and is bounded by `idle` instead, which
/// applies between body frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// Reading the request body
    pub read: Option<Duration>,
    /// Producing a complete non-streaming response
    pub write: Option<Duration>,
    /// Gap between response body frames
    pub idle: Option<Duration>,
}

/// HTTP transport for MCP protocol
pub struct HttpTransport {
    state: Arc<AppState>,
    cors_origin: Option<String>,
    max_request_size: usize,
    timeouts: HttpTimeouts,
}

impl HttpTransport {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            cors_origin: None,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            timeouts: HttpTimeouts::default(),
        }
    }

    /// Restrict CORS to a single origin instead of allowing any
    pub fn with_cors_origin(mut self, origin: Option<String>) -> Self {
        self.cors_origin = origin;
        self
    }

    pub fn with_max_request_size(mut self, bytes: usize) -> Self {
        self.max_request_size = bytes;
        self
    }

    pub fn with_timeouts(mut self, timeouts: HttpTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Build the axum router with its middleware stack
    pub fn router(&self) -> Router {
        let mut unary = Router::new()
            .route("/mcp", post(handle_mcp_request))
            .route("/health", get(health))
            .route("/stats", get(stats));
        if let Some(write) = self.timeouts.write {
            unary = unary.layer(TimeoutLayer::new(write));
        }

        // Added after the write timeout so streams are not cut off by it
        let mut app = unary.route("/mcp/stream", post(handle_mcp_stream));
        if let Some(read) = self.timeouts.read {
            app = app.layer(RequestBodyTimeoutLayer::new(read));
        }
        if let Some(idle) = self.timeouts.idle {
            app = app.layer(ResponseBodyTimeoutLayer::new(idle));
        }

        app.layer(DefaultBodyLimit::max(self.max_request_size))
            .layer(CatchPanicLayer::new())
            .layer(self.cors())
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.state))
    }

    fn cors(&self) -> CorsLayer {
        let origin = match self.cors_origin.as_deref() {
            None | Some("") | Some("*") => AllowOrigin::from(Any),
            Some(origin) => match HeaderValue::from_str(origin) {
                Ok(value) => AllowOrigin::exact(value),
                Err(e) => {
                    warn!(origin = %origin, error = %e, "Invalid CORS origin, allowing any");
                    AllowOrigin::from(Any)
                }
            },
        };

        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    }

    /// Serve on `listener` until `signal` resolves
    pub async fn serve<F>(&self, listener: TcpListener, signal: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(addr) = listener.local_addr() {
            info!("Starting MCP HTTP server on {}", addr);
        }

        axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await
    }
}

fn error_response(error: McpError) -> Response {
    debug!(code = error.code, message = %error.message, "Request failed");
    (StatusCode::BAD_REQUEST, Json(McpResponse::failure(error))).into_response()
}

fn unavailable(message: impl ToString) -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, message.to_string()).into_response()
}

fn pool_error(e: PoolError) -> McpError {
    McpError::capacity_exceeded(format!("Connection limit exceeded: {}", e))
}

/// Handle MCP JSON-RPC request via HTTP POST
async fn handle_mcp_request(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let _guard = match state.shutdown.admit().await {
        Ok(guard) => guard,
        Err(e) => return unavailable(e),
    };

    let request = match McpRequest::parse(&body) {
        Ok(request) => request,
        Err(e) => return error_response(e),
    };

    let mut conn = match state.pool.lease(&request.client_info()) {
        Ok(conn) => conn,
        Err(e) => return error_response(pool_error(e)),
    };

    let ctx = state.call_context();
    match state.router.dispatch(&ctx, &request, &mut conn).await {
        Ok(result) => Json(McpResponse::success(request.id.clone(), result)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Handle a streaming `tools/call` via Server-Sent Events
async fn handle_mcp_stream(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let guard = match state.shutdown.admit().await {
        Ok(guard) => guard,
        Err(e) => return unavailable(e),
    };

    let request = match McpRequest::parse(&body) {
        Ok(request) => request,
        Err(e) => return single_event(StreamEvent::error(e.message)),
    };

    if request.method != METHOD_TOOLS_CALL {
        return single_event(StreamEvent::error(format!(
            "streaming is only supported for {}",
            METHOD_TOOLS_CALL
        )));
    }

    let params = match ToolCallParams::from_params(request.params.as_ref()) {
        Ok(params) => params,
        Err(e) => return single_event(StreamEvent::error(e.message)),
    };

    let conn = match state.pool.lease(&request.client_info()) {
        Ok(conn) => conn,
        Err(e) => return single_event(StreamEvent::error(pool_error(e).message)),
    };

    info!(tool = %params.name, connection_id = %conn.id, "Streaming tool call");
    let events = state
        .streams
        .dispatch(state.call_context(), params, (guard, conn));

    sse(events)
}

fn single_event(event: StreamEvent) -> Response {
    sse(stream::iter([event]))
}

fn sse<S>(events: S) -> Response
where
    S: Stream<Item = StreamEvent> + Send + 'static,
{
    let frames = events.map(|event| {
        Event::default()
            .event(event.kind.as_str())
            .json_data(&event.data)
    });

    Sse::new(frames).into_response()
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Response {
    match state.shutdown.phase().await {
        Phase::Running => Json(json!({ "status": "healthy" })).into_response(),
        Phase::Draining | Phase::Stopped => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "draining" })),
        )
            .into_response(),
    }
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "server_info": state.router.server_info(),
        "connections": state.pool.stats(),
        "in_flight": state.shutdown.in_flight(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
