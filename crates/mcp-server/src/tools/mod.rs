//! Built-in tools

mod calculator;
mod text_processor;

use std::sync::Arc;
use tracing::warn;

use weave_core::{Tool, ToolRegistry};

pub use calculator::CalculatorTool;
pub use text_processor::StreamTextProcessor;

/// Every built-in tool
pub fn builtin_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(CalculatorTool),
        Arc::new(StreamTextProcessor::new()),
    ]
}

/// Register the built-in tools, skipping any whose category rejects them.
/// Returns how many were registered.
pub async fn register_builtin_tools(registry: &ToolRegistry) -> usize {
    let mut registered = 0;
    for tool in builtin_tools() {
        let name = tool.name().to_string();
        match registry.register(tool).await {
            Ok(()) => registered += 1,
            Err(e) => warn!(tool = %name, error = %e, "Built-in tool not registered"),
        }
    }
    registered
}
