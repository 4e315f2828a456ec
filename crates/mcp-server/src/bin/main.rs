//! Weave Toolkit server binary
//!
//! Loads the tool configuration, registers the built-in tools and serves
//! them over HTTP until SIGINT/SIGTERM, draining in-flight requests first.

use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use weave_mcp_server::{McpServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::parse();
    let _log_guard = init_logging(&config)?;

    info!(
        address = %config.address,
        max_connections = config.max_connections,
        tool_config = %config.tool_config.display(),
        "Starting Weave Toolkit"
    );

    let server = McpServer::from_config(config)
        .await
        .map_err(|e| format!("Failed to start server: {}", e))?;

    server.run().await?;

    Ok(())
}

/// Console logging, plus a daily rolling file when `--log-dir` is set.
/// The returned guard flushes the file writer on drop.
fn init_logging(config: &ServerConfig) -> std::io::Result<Option<WorkerGuard>> {
    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", config.log_level)));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, "weave-toolkit.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    Ok(guard)
}
