//! Drive the request router directly, without a network listener, to see
//! exactly what a client receives.

use serde_json::json;
use std::sync::Arc;

use weave_core::{CallContext, ToolManagerConfig, ToolRegistry};
use weave_mcp_server::{register_builtin_tools, ConnectionPool, McpRequest, RequestRouter};

#[tokio::main]
async fn main() {
    let registry = Arc::new(ToolRegistry::from_config(&ToolManagerConfig::default()));
    let count = register_builtin_tools(&registry).await;
    println!("Registered {} tools", count);

    let router = RequestRouter::new(registry);
    let pool = Arc::new(ConnectionPool::new(1));
    let ctx = CallContext::background();

    let requests = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {"clientInfo": {"name": "in_process", "version": "0.1.0"}}}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "calculator", "arguments": {"operation": "multiply", "operands": [5, 6]}}}),
        json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": {"name": "stream_text_processor", "arguments": {"text": "Hello World", "operation": "count"}}}),
        json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call", "params": {"name": "foo"}}),
    ];

    for body in requests {
        let request = McpRequest::from_value(body).expect("valid request");
        let mut conn = pool.lease(&request.client_info()).expect("pool has room");

        let response = router.handle(&ctx, &request, &mut conn).await;
        println!(
            "{} -> {}",
            request.method,
            serde_json::to_string_pretty(&response).expect("serializable response")
        );
    }
}
