//! Main MCP server orchestration

use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::pool::ConnectionPool;
use crate::protocol::RequestRouter;
use crate::shutdown::{DrainOutcome, ShutdownCoordinator};
use crate::stream::StreamDispatcher;
use crate::tools::register_builtin_tools;
use crate::transport::{AppState, HttpTransport};
use weave_core::{ToolManagerConfig, ToolRegistry};

/// MCP server
pub struct McpServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl McpServer {
    /// Create a server around an already populated registry
    pub fn new(config: ServerConfig, registry: Arc<ToolRegistry>) -> Self {
        let state = Arc::new(AppState {
            router: RequestRouter::new(Arc::clone(&registry)),
            streams: StreamDispatcher::new(registry),
            pool: Arc::new(ConnectionPool::new(config.max_connections)),
            shutdown: Arc::new(ShutdownCoordinator::new(config.shutdown_grace)),
            tool_timeout: config.tool_timeout,
        });

        Self { config, state }
    }

    /// Load the tool configuration file and register the built-in tools
    pub async fn from_config(config: ServerConfig) -> Result<Self, ServerError> {
        let tool_config = ToolManagerConfig::load_from_file(&config.tool_config)?;
        let registry = Arc::new(ToolRegistry::from_config(&tool_config));

        let registered = register_builtin_tools(&registry).await;
        info!(
            tools = registered,
            config = %config.tool_config.display(),
            "Tool registry ready"
        );

        Ok(Self::new(config, registry))
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn transport(&self) -> HttpTransport {
        HttpTransport::new(Arc::clone(&self.state))
            .with_cors_origin(self.config.cors_origin.clone())
            .with_max_request_size(self.config.max_request_size)
            .with_timeouts(self.config.http_timeouts())
    }

    /// Bind the configured address and serve until SIGINT/SIGTERM
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.address)
            .await
            .map_err(|source| ServerError::Bind {
                address: self.config.address.clone(),
                source,
            })?;

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `signal` resolves, then drain in-flight
    /// requests before closing the transport.
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let transport = self.transport();
        let mut server = tokio::spawn(async move {
            transport
                .serve(listener, async move {
                    let _ = stop_rx.await;
                })
                .await
        });

        tokio::select! {
            result = &mut server => {
                // The transport stopped without being asked to.
                return Ok(result??);
            }
            _ = signal => {}
        }

        info!("Shutting down server...");
        let outcome = self.state.shutdown.drain().await;
        let _ = stop_tx.send(());

        match outcome {
            DrainOutcome::Completed => {
                match tokio::time::timeout(self.state.shutdown.grace_period(), &mut server).await {
                    Ok(result) => result??,
                    Err(_) => {
                        warn!("Transport did not close in time, aborting");
                        server.abort();
                    }
                }
            }
            DrainOutcome::Forced { remaining } => {
                warn!(remaining, "Closing transport with requests still running");
                server.abort();
            }
        }

        info!("Server shutdown complete");
        Ok(())
    }
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
