//! Error types for the server crate

use thiserror::Error;

use weave_core::ConfigError;

/// Connection pool errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("connection pool exhausted, max size: {max_size}")]
    Exhausted { max_size: usize },
}

/// Admission errors raised by the shutdown coordinator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShutdownError {
    #[error("Service unavailable - server is shutting down")]
    ServiceUnavailable,
}

/// Startup and transport errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
