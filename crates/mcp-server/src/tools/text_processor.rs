//! Text statistics tool with streaming progress output

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::time::Duration;

use weave_core::{Category, Emit, StreamChunk, StreamingTool, Tool, ToolError};

const DEFAULT_OPERATION: &str = "analyze";

#[derive(Debug, Clone, PartialEq, Eq)]
struct TextArgs {
    text: String,
    operation: String,
}

impl TextArgs {
    fn parse(args: &Value) -> Result<Self, ToolError> {
        let args = args
            .as_object()
            .ok_or_else(|| ToolError::InvalidArguments("arguments must be an object".to_string()))?;

        let field = |key: &str| args.get(key).and_then(Value::as_str).map(str::to_string);

        let text = field("text").unwrap_or_default();
        if text.is_empty() {
            return Err(ToolError::MissingArgument("text"));
        }

        Ok(Self {
            text,
            operation: field("operation").unwrap_or_else(|| DEFAULT_OPERATION.to_string()),
        })
    }

    fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }

    fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    fn process(&self) -> Result<Value, ToolError> {
        let text = self.text.as_str();
        let result = match self.operation.as_str() {
            "split" => json!(text.split_whitespace().collect::<Vec<_>>()),
            "reverse" => json!(text.chars().rev().collect::<String>()),
            "count" => json!({
                "characters": text.chars().count(),
                "words": self.word_count(),
                "lines": self.line_count(),
            }),
            "analyze" => json!({
                "length": text.chars().count(),
                "word_count": self.word_count(),
                "line_count": self.line_count(),
                "has_uppercase": text.to_lowercase() != text,
                "has_lowercase": text.to_uppercase() != text,
            }),
            other => return Err(ToolError::UnsupportedOperation(other.to_string())),
        };

        Ok(json!({
            "original_text": text,
            "operation": self.operation,
            "result": result,
        }))
    }
}

/// Numbers progress messages in emission order
struct Progress<'a> {
    emit: Emit<'a>,
    next: usize,
}

impl Progress<'_> {
    fn send(&mut self, content: impl Into<String>) {
        (self.emit)(StreamChunk::new(content, self.next));
        self.next += 1;
    }
}

/// Splits, reverses, counts or analyzes text
pub struct StreamTextProcessor {
    step_delay: Duration,
}

impl StreamTextProcessor {
    pub fn new() -> Self {
        Self {
            step_delay: Duration::from_millis(100),
        }
    }

    /// Pause between progress messages
    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }

    async fn pause(&self, steps: u32) {
        if !self.step_delay.is_zero() {
            tokio::time::sleep(self.step_delay * steps).await;
        }
    }
}

impl Default for StreamTextProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for StreamTextProcessor {
    fn name(&self) -> &str {
        "stream_text_processor"
    }

    fn description(&self) -> &str {
        "Process text with streaming output (split, reverse, count, analyze)"
    }

    fn category(&self) -> Category {
        Category::Utility
    }

    fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        properties.insert("text".to_string(), json!({ "type": "string" }));
        properties.insert(
            "operation".to_string(),
            json!({
                "type": "string",
                "enum": ["split", "reverse", "count", "analyze"],
                "default": DEFAULT_OPERATION
            }),
        );
        json!({ "type": "object", "properties": properties, "required": ["text"] })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        TextArgs::parse(&args)?.process()
    }

    fn as_streaming(&self) -> Option<&dyn StreamingTool> {
        Some(self)
    }
}

#[async_trait]
impl StreamingTool for StreamTextProcessor {
    async fn execute_stream(&self, args: Value, emit: Emit<'_>) -> Result<Value, ToolError> {
        let args = TextArgs::parse(&args)?;
        let mut progress = Progress { emit, next: 0 };

        progress.send("Starting text processing...");
        self.pause(1).await;
        progress.send(format!("Input length: {} characters", args.text.chars().count()));
        self.pause(1).await;
        progress.send(format!("Operation: {}", args.operation));
        self.pause(1).await;

        let output = match args.process() {
            Ok(output) => output,
            Err(e) => {
                progress.send(format!("Processing failed: {}", e));
                return Err(e);
            }
        };

        match args.operation.as_str() {
            "split" => {
                progress.send("Splitting text...");
                for (i, word) in args.text.split_whitespace().enumerate() {
                    progress.send(format!("Word {}: {}", i + 1, word));
                    self.pause(1).await;
                }
                progress.send("Text split complete");
            }
            "reverse" => {
                progress.send("Reversing text...");
                self.pause(2).await;
                progress.send("Text reversed");
                progress.send(format!("Result: {}", output["result"].as_str().unwrap_or_default()));
            }
            "count" => {
                progress.send("Counting text statistics...");
                self.pause(2).await;
                let counts = &output["result"];
                progress.send(format!(
                    "Counted: {} characters, {} words, {} lines",
                    counts["characters"], counts["words"], counts["lines"]
                ));
            }
            _ => {
                progress.send("Analyzing text features...");
                self.pause(2).await;
                progress.send("Analysis complete");
            }
        }

        progress.send("Processing complete!");
        Ok(output)
    }
}
