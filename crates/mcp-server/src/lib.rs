//! # weave-mcp-server
//!
//! MCP (Model Context Protocol) tool server for Weave Toolkit.
//! Serves JSON-RPC requests over HTTP and streaming tool calls over
//! Server-Sent Events.

pub mod config;
pub mod error;
pub mod pool;
pub mod protocol;
mod server;
pub mod shutdown;
pub mod stream;
pub mod tools;
pub mod transport;

pub use config::ServerConfig;
pub use error::{PoolError, ServerError, ShutdownError};
pub use pool::{Connection, ConnectionPool, PoolStats, PooledConnection};
pub use protocol::{McpError, McpRequest, McpResponse, RequestRouter, ServerCapabilities};
pub use server::{shutdown_signal, McpServer};
pub use shutdown::{DrainOutcome, Phase, ShutdownCoordinator};
pub use stream::{StreamDispatcher, StreamEvent, StreamEventKind};
pub use tools::{builtin_tools, register_builtin_tools, CalculatorTool, StreamTextProcessor};
pub use transport::{AppState, HttpTimeouts, HttpTransport};
