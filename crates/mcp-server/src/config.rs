//! Server configuration from command-line flags and environment variables

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::pool::DEFAULT_MAX_CONNECTIONS;
use crate::shutdown::DEFAULT_GRACE_PERIOD;
use crate::transport::{HttpTimeouts, DEFAULT_MAX_REQUEST_SIZE};

pub const DEFAULT_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_TOOL_CONFIG_PATH: &str = "tool-config.json";

/// Weave Toolkit - MCP tool server over HTTP and Server-Sent Events
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "weave-toolkit")]
#[command(version)]
#[command(about = "Weave Toolkit - MCP tool server over HTTP and Server-Sent Events")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "MCP_SERVER_ADDRESS", default_value = DEFAULT_ADDRESS)]
    pub address: String,

    /// Requests serviced at once
    #[arg(long, env = "MCP_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,

    /// Deadline for every tool call, e.g. "10s" (category timeouts still apply)
    #[arg(long, env = "MCP_TOOL_TIMEOUT", value_parser = humantime::parse_duration)]
    pub tool_timeout: Option<Duration>,

    /// Maximum request body size in bytes
    #[arg(long, env = "MCP_MAX_REQUEST_SIZE", default_value_t = DEFAULT_MAX_REQUEST_SIZE)]
    pub max_request_size: usize,

    /// How long shutdown waits for in-flight requests
    #[arg(
        long,
        env = "MCP_SHUTDOWN_GRACE",
        value_parser = humantime::parse_duration,
        default_value = "30s"
    )]
    pub shutdown_grace: Duration,

    /// Deadline for reading a request body
    #[arg(long, env = "MCP_READ_TIMEOUT", value_parser = humantime::parse_duration)]
    pub read_timeout: Option<Duration>,

    /// Deadline for a complete non-streaming response
    #[arg(long, env = "MCP_WRITE_TIMEOUT", value_parser = humantime::parse_duration)]
    pub write_timeout: Option<Duration>,

    /// Longest gap between response frames, streams included
    #[arg(long, env = "MCP_IDLE_TIMEOUT", value_parser = humantime::parse_duration)]
    pub idle_timeout: Option<Duration>,

    /// Allowed CORS origin (any when unset)
    #[arg(long, env = "MCP_CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// Tool configuration file (JSON, or YAML by extension)
    #[arg(long, env = "TOOL_CONFIG_PATH", default_value = DEFAULT_TOOL_CONFIG_PATH)]
    pub tool_config: PathBuf,

    /// Log level, overridden by RUST_LOG
    #[arg(long, env = "MCP_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, env = "MCP_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn http_timeouts(&self) -> HttpTimeouts {
        HttpTimeouts {
            read: self.read_timeout,
            write: self.write_timeout,
            idle: self.idle_timeout,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            tool_timeout: None,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            shutdown_grace: DEFAULT_GRACE_PERIOD,
            read_timeout: None,
            write_timeout: None,
            idle_timeout: None,
            cors_origin: None,
            tool_config: PathBuf::from(DEFAULT_TOOL_CONFIG_PATH),
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}
