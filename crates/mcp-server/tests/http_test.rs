//! End-to-end tests of the HTTP transport, driven through the axum router

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use async_trait::async_trait;
use weave_core::{Category, Tool, ToolError, ToolManagerConfig, ToolRegistry};
use weave_mcp_server::{
    AppState, CalculatorTool, ConnectionPool, HttpTimeouts, HttpTransport, RequestRouter,
    ShutdownCoordinator, StreamDispatcher, StreamTextProcessor,
};

struct TestServer {
    state: Arc<AppState>,
    app: Router,
}

/// Non-streaming utility tool that takes a minute to answer
struct SlowTool;

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }

    fn description(&self) -> &str {
        "Answers after a minute"
    }

    fn category(&self) -> Category {
        Category::Utility
    }

    async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(json!({"result": "late"}))
    }
}

async fn test_server(max_connections: usize) -> TestServer {
    build_server(max_connections, Duration::ZERO, HttpTimeouts::default()).await
}

async fn build_server(
    max_connections: usize,
    step_delay: Duration,
    timeouts: HttpTimeouts,
) -> TestServer {
    let registry = Arc::new(ToolRegistry::from_config(&ToolManagerConfig::default()));
    registry.register(Arc::new(CalculatorTool)).await.unwrap();
    registry
        .register(Arc::new(
            StreamTextProcessor::new().with_step_delay(step_delay),
        ))
        .await
        .unwrap();

    let state = Arc::new(AppState {
        router: RequestRouter::new(Arc::clone(&registry)),
        streams: StreamDispatcher::new(registry),
        pool: Arc::new(ConnectionPool::new(max_connections)),
        shutdown: Arc::new(ShutdownCoordinator::new(Duration::from_secs(1))),
        tool_timeout: None,
    });
    let app = HttpTransport::new(Arc::clone(&state))
        .with_timeouts(timeouts)
        .router();

    TestServer { state, app }
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn rpc(app: &Router, body: Value) -> (StatusCode, Value) {
    let (status, body) = send(app, post("/mcp", body.to_string())).await;
    (status, serde_json::from_str(&body).unwrap())
}

/// Parse a `text/event-stream` body into (event, data) pairs
fn sse_frames(body: &str) -> Vec<(String, Value)> {
    body.split("\n\n")
        .filter(|frame| !frame.trim().is_empty())
        .map(|frame| {
            let mut event = String::new();
            let mut data = String::new();
            for line in frame.lines() {
                if let Some(value) = line.strip_prefix("event:") {
                    event = value.trim().to_string();
                } else if let Some(value) = line.strip_prefix("data:") {
                    data.push_str(value.trim_start());
                }
            }
            (event, serde_json::from_str(&data).unwrap())
        })
        .collect()
}

fn result_text(result: &Value) -> Value {
    let text = result["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn test_calculator_multiply_with_operands() {
    let server = test_server(10).await;

    let (status, body) = rpc(
        &server.app,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": "calculator", "arguments": {"operation": "multiply", "operands": [5, 6]}}
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["id"], 1);
    assert_eq!(result_text(&body["result"]), json!({"result": 30}));
}

#[tokio::test]
async fn test_division_by_zero_is_an_error_envelope() {
    let server = test_server(10).await;

    let (status, body) = rpc(
        &server.app,
        json!({
            "id": 2,
            "method": "tools/call",
            "params": {"name": "calculator", "arguments": {"operation": "divide", "a": 10, "b": 0}}
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["id"], Value::Null);
    assert_eq!(body["error"]["code"], -32603);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("division by zero"));
}

#[tokio::test]
async fn test_unknown_tool() {
    let server = test_server(10).await;

    let (status, body) = rpc(
        &server.app,
        json!({"id": 3, "method": "tools/call", "params": {"name": "foo", "arguments": {}}}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "tool not found: foo");
}

#[tokio::test]
async fn test_malformed_requests() {
    let server = test_server(10).await;

    let (status, body) = send(&server.app, post("/mcp", "{not json")).await;
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["error"]["message"], "Invalid JSON");

    let (status, body) = rpc(&server.app, json!({"id": 4, "params": {}})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["error"]["message"], "Missing or invalid method");

    let (_, body) = rpc(&server.app, json!({"id": 5, "method": "sampling/create"})).await;
    assert_eq!(body["error"]["code"], -32603);
    assert_eq!(body["error"]["message"], "unsupported method: sampling/create");
}

#[tokio::test]
async fn test_absent_id_is_echoed_as_null() {
    let server = test_server(10).await;

    let (status, body) = rpc(&server.app, json!({"method": "notifications/initialized"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], Value::Null);
    assert_eq!(body["result"], json!({}));
}

#[tokio::test]
async fn test_disabled_category_hidden_from_listing() {
    let server = test_server(10).await;
    server
        .state
        .router
        .registry()
        .set_category_enabled(Category::Math, false)
        .await
        .unwrap();

    let (_, body) = rpc(&server.app, json!({"id": 6, "method": "tools/list"})).await;
    let names: Vec<&str> = body["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["stream_text_processor"]);

    let (_, body) = rpc(
        &server.app,
        json!({"id": 7, "method": "tools/call", "params": {"name": "calculator", "arguments": {"operation": "add", "a": 1, "b": 2}}}),
    )
    .await;
    assert_eq!(body["error"]["message"], "tool not found: calculator");
}

#[tokio::test]
async fn test_stream_split() {
    let server = test_server(10).await;

    let request = post(
        "/mcp/stream",
        json!({
            "id": 8,
            "method": "tools/call",
            "params": {
                "name": "stream_text_processor",
                "arguments": {"text": "hello world", "operation": "split"}
            }
        })
        .to_string(),
    );
    let response = server.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let frames = sse_frames(std::str::from_utf8(&body).unwrap());

    assert_eq!(frames[0].0, "tool/call");
    assert_eq!(
        frames[0].1,
        json!({"tool": "stream_text_processor", "status": "started"})
    );

    let content: Vec<&Value> = frames
        .iter()
        .filter(|(event, _)| event == "content")
        .map(|(_, data)| data)
        .collect();
    assert!(content.iter().any(|c| c["content"] == "Word 1: hello"));
    assert!(content.iter().all(|c| c["type"] == "text"));

    let (event, data) = frames.last().unwrap();
    assert_eq!(event, "done");
    assert_eq!(
        result_text(&data["result"]),
        json!({"original_text": "hello world", "operation": "split", "result": ["hello", "world"]})
    );
    assert_eq!(
        frames
            .iter()
            .filter(|(event, _)| event == "done" || event == "error")
            .count(),
        1
    );
}

#[tokio::test]
async fn test_stream_rejects_other_methods_with_single_error() {
    let server = test_server(10).await;

    let (status, body) = send(
        &server.app,
        post("/mcp/stream", json!({"id": 9, "method": "tools/list"}).to_string()),
    )
    .await;
    let frames = sse_frames(&body);

    assert_eq!(status, StatusCode::OK);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].0, "error");
    assert_eq!(
        frames[0].1["message"],
        "streaming is only supported for tools/call"
    );

    let (_, body) = send(&server.app, post("/mcp/stream", "garbage")).await;
    let frames = sse_frames(&body);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].1["message"], "Invalid JSON");
}

#[tokio::test]
async fn test_pool_exhaustion() {
    let server = test_server(1).await;
    let _held = server
        .state
        .pool
        .lease(&Default::default())
        .unwrap();

    let (status, body) = rpc(&server.app, json!({"id": 10, "method": "tools/list"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], -32000);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Connection limit exceeded"));
}

#[tokio::test]
async fn test_stream_pool_exhaustion_is_single_error_event() {
    let server = test_server(1).await;
    let _held = server
        .state
        .pool
        .lease(&Default::default())
        .unwrap();

    let (status, body) = send(
        &server.app,
        post(
            "/mcp/stream",
            json!({
                "id": 13,
                "method": "tools/call",
                "params": {"name": "calculator", "arguments": {"operation": "add", "a": 1, "b": 2}}
            })
            .to_string(),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let frames = sse_frames(&body);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].0, "error");
    assert!(frames[0].1["message"]
        .as_str()
        .unwrap()
        .starts_with("Connection limit exceeded"));
    assert_eq!(server.state.pool.stats().active, 1);
}

#[tokio::test]
async fn test_non_streaming_tool_on_stream_endpoint() {
    let server = test_server(10).await;

    let (status, body) = send(
        &server.app,
        post(
            "/mcp/stream",
            json!({
                "id": 14,
                "method": "tools/call",
                "params": {"name": "calculator", "arguments": {"operation": "multiply", "operands": [5, 6]}}
            })
            .to_string(),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let frames = sse_frames(&body);
    let events: Vec<&str> = frames.iter().map(|(event, _)| event.as_str()).collect();
    assert_eq!(events, ["tool/call", "done"]);
    assert_eq!(frames[0].1, json!({"tool": "calculator", "status": "started"}));
    assert_eq!(frames[1].1["result"]["content"][0]["type"], "text");
    assert_eq!(result_text(&frames[1].1["result"]), json!({"result": 30}));
}

#[tokio::test(start_paused = true)]
async fn test_write_timeout_bounds_unary_requests() {
    let timeouts = HttpTimeouts {
        write: Some(Duration::from_secs(1)),
        ..Default::default()
    };
    let server = build_server(10, Duration::ZERO, timeouts).await;
    server
        .state
        .router
        .registry()
        .register(Arc::new(SlowTool))
        .await
        .unwrap();

    let (status, _) = send(
        &server.app,
        post(
            "/mcp",
            json!({"id": 15, "method": "tools/call", "params": {"name": "slow"}}).to_string(),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);

    let (status, _) = rpc(&server.app, json!({"id": 16, "method": "tools/list"})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test(start_paused = true)]
async fn test_write_timeout_does_not_cut_streams() {
    let timeouts = HttpTimeouts {
        write: Some(Duration::from_millis(50)),
        ..Default::default()
    };
    let server = build_server(10, Duration::from_millis(40), timeouts).await;

    let (status, body) = send(
        &server.app,
        post(
            "/mcp/stream",
            json!({
                "id": 17,
                "method": "tools/call",
                "params": {
                    "name": "stream_text_processor",
                    "arguments": {"text": "one two three", "operation": "split"}
                }
            })
            .to_string(),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let frames = sse_frames(&body);
    assert_eq!(frames.last().unwrap().0, "done");
}

#[tokio::test(start_paused = true)]
async fn test_idle_stream_is_cut_and_released() {
    let timeouts = HttpTimeouts {
        idle: Some(Duration::from_millis(50)),
        ..Default::default()
    };
    let server = build_server(10, Duration::from_secs(10), timeouts).await;

    let request = post(
        "/mcp/stream",
        json!({
            "id": 18,
            "method": "tools/call",
            "params": {
                "name": "stream_text_processor",
                "arguments": {"text": "one two", "operation": "split"}
            }
        })
        .to_string(),
    );
    let response = server.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(to_bytes(response.into_body(), usize::MAX).await.is_err());

    while server.state.shutdown.in_flight() > 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(server.state.pool.stats().active, 0);
}

#[tokio::test]
async fn test_pool_handle_released_after_request() {
    let server = test_server(1).await;

    for id in 0..3 {
        let (status, _) = rpc(&server.app, json!({"id": id, "method": "tools/list"})).await;
        assert_eq!(status, StatusCode::OK);
    }

    let stats = server.state.pool.stats();
    assert_eq!(stats.active, 0);
    assert_eq!(stats.idle, 1);
}

#[tokio::test]
async fn test_health_and_stats() {
    let server = test_server(10).await;

    let (status, body) = send(&server.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({"status": "healthy"}));

    let (status, body) = send(&server.app, get("/stats")).await;
    let stats: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["server_info"]["name"], "Weave-Toolkit");
    assert_eq!(stats["connections"]["max_size"], 10);
    assert_eq!(stats["connections"]["available"], 10);
    assert_eq!(stats["in_flight"], 0);
    assert!(chrono::DateTime::parse_from_rfc3339(stats["timestamp"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_draining_rejects_requests() {
    let server = test_server(10).await;
    server.state.shutdown.drain().await;

    let (status, body) = send(
        &server.app,
        post("/mcp", json!({"id": 11, "method": "tools/list"}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "Service unavailable - server is shutting down");

    let (status, _) = send(
        &server.app,
        post("/mcp/stream", json!({"id": 12, "method": "tools/call"}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = send(&server.app, get("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({"status": "draining"}));
}

#[tokio::test]
async fn test_request_body_limit() {
    let registry = Arc::new(ToolRegistry::from_config(&ToolManagerConfig::default()));
    let state = Arc::new(AppState {
        router: RequestRouter::new(Arc::clone(&registry)),
        streams: StreamDispatcher::new(registry),
        pool: Arc::new(ConnectionPool::new(1)),
        shutdown: Arc::new(ShutdownCoordinator::default()),
        tool_timeout: None,
    });
    let app = HttpTransport::new(state).with_max_request_size(64).router();

    let oversized = json!({"id": 1, "method": "tools/list", "params": {"pad": "x".repeat(256)}});
    let (status, _) = send(&app, post("/mcp", oversized.to_string())).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
