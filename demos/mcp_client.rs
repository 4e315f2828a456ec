//! Talk to a running server: list tools, call the calculator and stream a
//! text-processing call.
//!
//! ```text
//! cargo run --bin weave-toolkit &
//! cargo run --example mcp_client -- http://localhost:8080
//! ```

use serde_json::json;
use weave_demos::McpClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8080".to_string());
    let client = McpClient::new(&base_url);

    let init = client
        .request(
            "initialize",
            json!({"protocolVersion": "2025-06-18", "clientInfo": {"name": "mcp_client", "version": "0.1.0"}}),
        )
        .await?;
    println!("Connected to {}", init["serverInfo"]);

    let tools = client.request("tools/list", json!({})).await?;
    for tool in tools["tools"].as_array().into_iter().flatten() {
        println!("  - {}: {}", tool["name"], tool["description"]);
    }

    let sum = client
        .call_tool("calculator", json!({"operation": "add", "a": 15, "b": 27}))
        .await?;
    println!("15 + 27 -> {}", sum["content"][0]["text"]);

    match client
        .call_tool("calculator", json!({"operation": "divide", "a": 1, "b": 0}))
        .await
    {
        Ok(result) => println!("1 / 0 -> {}", result),
        Err(e) => println!("1 / 0 -> {}", e),
    }

    println!("Streaming stream_text_processor:");
    client
        .stream_tool(
            "stream_text_processor",
            json!({"text": "the quick brown fox", "operation": "split"}),
            |frame| println!("  [{}] {}", frame.event, frame.data),
        )
        .await?;

    let (_, stats) = client.get("/stats").await?;
    println!("Stats: {}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
