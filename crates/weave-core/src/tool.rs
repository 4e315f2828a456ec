//! The tool contract and the uniform call-result envelope

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::category::Category;
use crate::error::ToolError;

/// One incremental emission of a streaming tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamChunk {
    pub content: String,
    pub index: usize,
}

impl StreamChunk {
    pub fn new(content: impl Into<String>, index: usize) -> Self {
        Self {
            content: content.into(),
            index,
        }
    }
}

/// Callback a streaming tool pushes its chunks into, in emission order
pub type Emit<'a> = &'a (dyn Fn(StreamChunk) + Send + Sync);

/// A named, invocable unit of functionality.
///
/// Implementations are shared behind `Arc` and invoked concurrently.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn category(&self) -> Category;

    /// JSON Schema of the `arguments` object
    fn input_schema(&self) -> Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError>;

    /// Streaming view of this tool, if it supports incremental output
    fn as_streaming(&self) -> Option<&dyn StreamingTool> {
        None
    }
}

/// A tool that can report progress while it runs
#[async_trait]
pub trait StreamingTool: Tool {
    async fn execute_stream(&self, args: Value, emit: Emit<'_>) -> Result<Value, ToolError>;
}

/// Public metadata of a registered tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub category: Category,
    pub input_schema: Value,
}

/// Tool call result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
}

impl ToolCallResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
        }
    }

    /// Wrap raw tool output, serialized as JSON text
    pub fn from_output(output: &Value) -> Self {
        Self::text(output.to_string())
    }

    /// Text of the first content item
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|c| match c {
            ToolContent::Text { text } => text.as_str(),
        })
    }
}

/// Tool content types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
}
