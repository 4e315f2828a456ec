//! Streaming tool calls
//!
//! A streaming call produces `tool/call`, then zero or more `content`
//! events, then exactly one `done` or `error` event.

use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error};

use crate::protocol::ToolCallParams;
use weave_core::{CallContext, StreamChunk, ToolCallResult, ToolRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEventKind {
    ToolCall,
    Content,
    Done,
    Error,
}

impl StreamEventKind {
    /// SSE event name
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamEventKind::ToolCall => "tool/call",
            StreamEventKind::Content => "content",
            StreamEventKind::Done => "done",
            StreamEventKind::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEventKind::Done | StreamEventKind::Error)
    }
}

impl fmt::Display for StreamEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub kind: StreamEventKind,
    pub data: Value,
}

impl StreamEvent {
    pub fn started(tool: &str) -> Self {
        Self {
            kind: StreamEventKind::ToolCall,
            data: json!({ "tool": tool, "status": "started" }),
        }
    }

    pub fn content(chunk: &StreamChunk) -> Self {
        Self {
            kind: StreamEventKind::Content,
            data: json!({ "type": "text", "content": chunk.content, "index": chunk.index }),
        }
    }

    pub fn done(result: &ToolCallResult) -> Self {
        Self {
            kind: StreamEventKind::Done,
            data: json!({ "result": result }),
        }
    }

    pub fn error(message: impl fmt::Display) -> Self {
        Self {
            kind: StreamEventKind::Error,
            data: json!({ "message": message.to_string() }),
        }
    }
}

/// Runs streaming calls against the registry and turns their output into events
#[derive(Clone)]
pub struct StreamDispatcher {
    registry: Arc<ToolRegistry>,
}

impl StreamDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Start a streaming call.
    ///
    /// The tool runs on its own task. `hold` is kept alive until the terminal
    /// event has been queued, so per-request resources (pool handle,
    /// in-flight guard) cover the whole call. Dropping the returned stream
    /// cancels the call and releases `hold`.
    pub fn dispatch<H>(
        &self,
        ctx: CallContext,
        params: ToolCallParams,
        hold: H,
    ) -> UnboundedReceiverStream<StreamEvent>
    where
        H: Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let registry = Arc::clone(&self.registry);
        let tool_name = params.name.clone();

        let worker_tx = tx.clone();
        let worker = tokio::spawn(async move {
            let _ = worker_tx.send(StreamEvent::started(&params.name));

            let emit = |chunk: StreamChunk| {
                let _ = worker_tx.send(StreamEvent::content(&chunk));
            };
            let call = registry.invoke_stream(&ctx, &params.name, params.arguments, &emit);

            tokio::select! {
                result = call => Some(result),
                _ = worker_tx.closed() => None,
            }
        });

        tokio::spawn(async move {
            let terminal = match worker.await {
                Ok(None) => {
                    debug!(tool = %tool_name, "Client disconnected, streaming call cancelled");
                    drop(hold);
                    return;
                }
                Ok(Some(Ok(result))) => {
                    debug!(tool = %tool_name, "Streaming call completed");
                    StreamEvent::done(&result)
                }
                Ok(Some(Err(e))) => {
                    debug!(tool = %tool_name, error = %e, "Streaming call failed");
                    StreamEvent::error(e)
                }
                Err(e) => {
                    error!(tool = %tool_name, error = %e, "Streaming tool task aborted");
                    StreamEvent::error(format!("tool execution failed: {}", tool_name))
                }
            };

            // The receiver may already be gone if the client disconnected.
            let _ = tx.send(terminal);
            drop(hold);
        });

        UnboundedReceiverStream::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::StreamTextProcessor;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use weave_core::{Category, CategoryConfig, Tool, ToolError};

    struct PanickingTool;

    #[async_trait]
    impl Tool for PanickingTool {
        fn name(&self) -> &str {
            "explode"
        }

        fn description(&self) -> &str {
            "Always panics"
        }

        fn category(&self) -> Category {
            Category::Utility
        }

        async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
            panic!("boom");
        }
    }

    struct SleepyTool {
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Tool for SleepyTool {
        fn name(&self) -> &str {
            "sleepy"
        }

        fn description(&self) -> &str {
            "Sleeps for an hour"
        }

        fn category(&self) -> Category {
            Category::Utility
        }

        async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(json!({}))
        }
    }

    async fn dispatcher() -> StreamDispatcher {
        let registry = Arc::new(ToolRegistry::new([(
            Category::Utility,
            CategoryConfig::enabled(10),
        )]));
        registry
            .register(Arc::new(
                StreamTextProcessor::new().with_step_delay(Duration::ZERO),
            ))
            .await
            .unwrap();
        registry.register(Arc::new(PanickingTool)).await.unwrap();
        StreamDispatcher::new(registry)
    }

    fn params(name: &str, arguments: Value) -> ToolCallParams {
        ToolCallParams {
            name: name.to_string(),
            arguments,
        }
    }

    async fn collect(stream: UnboundedReceiverStream<StreamEvent>) -> Vec<StreamEvent> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_stream_event_sequence() {
        let dispatcher = dispatcher().await;
        let events = collect(dispatcher.dispatch(
            CallContext::background(),
            params(
                "stream_text_processor",
                json!({"text": "hello world", "operation": "split"}),
            ),
            (),
        ))
        .await;

        assert_eq!(events[0], StreamEvent::started("stream_text_processor"));

        let contents: Vec<&StreamEvent> = events
            .iter()
            .filter(|e| e.kind == StreamEventKind::Content)
            .collect();
        assert!(!contents.is_empty());
        for (i, event) in contents.iter().enumerate() {
            assert_eq!(event.data["type"], "text");
            assert_eq!(event.data["index"], i);
        }

        let last = events.last().unwrap();
        assert_eq!(last.kind, StreamEventKind::Done);
        assert_eq!(events.iter().filter(|e| e.kind.is_terminal()).count(), 1);

        let text = last.data["result"]["content"][0]["text"].as_str().unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(text).unwrap(),
            json!({
                "original_text": "hello world",
                "operation": "split",
                "result": ["hello", "world"]
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_ends_with_error() {
        let dispatcher = dispatcher().await;
        let events = collect(dispatcher.dispatch(
            CallContext::background(),
            params("foo", json!({})),
            (),
        ))
        .await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, StreamEventKind::ToolCall);
        assert_eq!(events[1], StreamEvent::error("tool not found: foo"));
    }

    #[tokio::test]
    async fn test_tool_failure_after_progress() {
        let dispatcher = dispatcher().await;
        let events = collect(dispatcher.dispatch(
            CallContext::background(),
            params(
                "stream_text_processor",
                json!({"text": "abc", "operation": "shout"}),
            ),
            (),
        ))
        .await;

        let last = events.last().unwrap();
        assert_eq!(last.kind, StreamEventKind::Error);
        assert_eq!(last.data["message"], "unsupported operation: shout");
        assert!(events
            .iter()
            .any(|e| e.data["content"] == "Processing failed: unsupported operation: shout"));
    }

    #[tokio::test]
    async fn test_panicking_tool_still_terminates() {
        let dispatcher = dispatcher().await;
        let events = collect(dispatcher.dispatch(
            CallContext::background(),
            params("explode", json!({})),
            (),
        ))
        .await;

        let last = events.last().unwrap();
        assert_eq!(last.kind, StreamEventKind::Error);
        assert_eq!(last.data["message"], "tool execution failed: explode");
    }

    #[tokio::test]
    async fn test_hold_released_after_terminal_event() {
        let dispatcher = dispatcher().await;
        let hold = Arc::new(());
        let watcher = Arc::clone(&hold);

        let events = collect(dispatcher.dispatch(
            CallContext::background(),
            params("stream_text_processor", json!({"text": "x", "operation": "reverse"})),
            hold,
        ))
        .await;

        assert_eq!(events.last().unwrap().kind, StreamEventKind::Done);
        assert_eq!(Arc::strong_count(&watcher), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_stream_cancels_call() {
        let finished = Arc::new(AtomicBool::new(false));
        let registry = Arc::new(ToolRegistry::new([(
            Category::Utility,
            CategoryConfig::enabled(10),
        )]));
        registry
            .register(Arc::new(SleepyTool {
                finished: Arc::clone(&finished),
            }))
            .await
            .unwrap();
        let dispatcher = StreamDispatcher::new(registry);

        let hold = Arc::new(());
        let watcher = Arc::clone(&hold);
        let mut events = dispatcher.dispatch(
            CallContext::background(),
            params("sleepy", json!({})),
            hold,
        );

        assert_eq!(events.next().await, Some(StreamEvent::started("sleepy")));
        drop(events);

        while Arc::strong_count(&watcher) > 1 {
            tokio::task::yield_now().await;
        }

        tokio::time::advance(Duration::from_secs(3601)).await;
        tokio::task::yield_now().await;
        assert!(!finished.load(Ordering::SeqCst));
    }
}
