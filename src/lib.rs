//! Minimal HTTP client for a running Weave Toolkit server, used by the demos.

use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One server-sent event
#[derive(Debug, Clone, PartialEq)]
pub struct SseFrame {
    pub event: String,
    pub data: Value,
}

impl SseFrame {
    /// Decode one `event:`/`data:` block; blocks without data are skipped
    pub fn parse(block: &str) -> Result<Option<Self>, serde_json::Error> {
        let mut event = String::from("message");
        let mut data = String::new();

        for line in block.lines() {
            if let Some(value) = line.strip_prefix("event:") {
                event = value.trim().to_string();
            } else if let Some(value) = line.strip_prefix("data:") {
                if !data.is_empty() {
                    data.push('\n');
                }
                data.push_str(value.strip_prefix(' ').unwrap_or(value));
            }
        }

        if data.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            event,
            data: serde_json::from_str(&data)?,
        }))
    }
}

pub struct McpClient {
    http: reqwest::Client,
    base_url: String,
    next_id: AtomicU64,
}

impl McpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(1),
        }
    }

    fn envelope(&self, method: &str, params: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        })
    }

    /// Send a request to `/mcp` and return its `result`
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let body: Value = self
            .http
            .post(format!("{}/mcp", self.base_url))
            .json(&self.envelope(method, params))
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = body.get("error") {
            return Err(ClientError::Rpc {
                code: error["code"].as_i64().unwrap_or_default(),
                message: error["message"].as_str().unwrap_or_default().to_string(),
            });
        }
        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ClientError> {
        self.request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await
    }

    /// Stream a tool call from `/mcp/stream`, handing each frame to
    /// `on_frame` as soon as it arrives. Returns every frame received.
    pub async fn stream_tool(
        &self,
        name: &str,
        arguments: Value,
        mut on_frame: impl FnMut(&SseFrame),
    ) -> Result<Vec<SseFrame>, ClientError> {
        let response = self
            .http
            .post(format!("{}/mcp/stream", self.base_url))
            .json(&self.envelope("tools/call", json!({ "name": name, "arguments": arguments })))
            .send()
            .await?
            .error_for_status()?;

        let mut frames = Vec::new();
        let mut buffer = String::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            buffer.push_str(&String::from_utf8_lossy(&chunk?));

            while let Some(end) = buffer.find("\n\n") {
                let block: String = buffer.drain(..end + 2).collect();
                if let Some(frame) = SseFrame::parse(&block)? {
                    on_frame(&frame);
                    frames.push(frame);
                }
            }
        }

        Ok(frames)
    }

    /// `GET` a JSON endpoint such as `/health` or `/stats`
    pub async fn get(&self, path: &str) -> Result<(u16, Value), ClientError> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        let status = response.status().as_u16();
        Ok((status, response.json().await?))
    }
}
