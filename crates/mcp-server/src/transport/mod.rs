//! Transport implementations for MCP server

mod http;

pub use http::{AppState, HttpTimeouts, HttpTransport, DEFAULT_MAX_REQUEST_SIZE};
