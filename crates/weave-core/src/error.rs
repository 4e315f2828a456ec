//! Error types for weave-core

use std::time::Duration;
use thiserror::Error;

use crate::category::Category;

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Failures raised by a tool implementation.
///
/// These are domain errors and reach the caller unchanged, so the display
/// text is part of the wire contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0} parameter is required")]
    MissingArgument(&'static str),

    #[error("division by zero")]
    DivisionByZero,

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("{0}")]
    Failed(String),
}

/// Registry error types
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("category not found: {0}")]
    CategoryNotFound(String),

    #[error("category is disabled: {0}")]
    CategoryDisabled(Category),

    #[error("category {category} reached maximum tools limit: {max}")]
    CategoryFull { category: Category, max: usize },

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("tool execution failed: {tool} timed out after {elapsed:?}")]
    Timeout { tool: String, elapsed: Duration },

    #[error("too many concurrent tool calls (limit {0})")]
    TooManyConcurrentCalls(usize),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("tool config file not found: {0}")]
    NotFound(String),

    #[error("failed to read tool config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse tool config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse tool config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
