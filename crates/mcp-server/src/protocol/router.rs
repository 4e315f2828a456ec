//! Method dispatch for MCP requests

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::capabilities::ServerCapabilities;
use super::types::*;
use crate::pool::Connection;
use weave_core::{CallContext, RegistryError, ToolRegistry};

/// Routes decoded requests to the tool registry
pub struct RequestRouter {
    registry: Arc<ToolRegistry>,
    server_info: ServerInfo,
}

impl RequestRouter {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            server_info: ServerInfo::default(),
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Dispatch a request and wrap the outcome in a response envelope
    pub async fn handle(
        &self,
        ctx: &CallContext,
        request: &McpRequest,
        conn: &mut Connection,
    ) -> McpResponse {
        match self.dispatch(ctx, request, conn).await {
            Ok(result) => McpResponse::success(request.id.clone(), result),
            Err(e) => McpResponse::failure(e),
        }
    }

    /// Resolve the method name and run it
    pub async fn dispatch(
        &self,
        ctx: &CallContext,
        request: &McpRequest,
        conn: &mut Connection,
    ) -> Result<Value, McpError> {
        debug!(method = %request.method, connection_id = %conn.id, "Handling request");

        match request.method.as_str() {
            METHOD_INITIALIZE => self.handle_initialize(request, conn),
            METHOD_INITIALIZED => {
                info!(client = %conn.client.name, "Client initialized");
                Ok(json!({}))
            }
            METHOD_TOOLS_LIST => self.handle_tools_list().await,
            METHOD_TOOLS_CALL => self.handle_tools_call(ctx, request).await,
            METHOD_RESOURCES_LIST => Ok(json!({ "resources": [] })),
            METHOD_PROMPTS_LIST => Ok(json!({ "prompts": [] })),
            METHOD_ROOTS_LIST => Ok(json!({ "roots": [] })),
            other => Err(McpError::method_not_supported(other)),
        }
    }

    fn handle_initialize(&self, request: &McpRequest, conn: &mut Connection) -> Result<Value, McpError> {
        let client_version = request
            .params
            .as_ref()
            .and_then(|p| p.get("protocolVersion"))
            .cloned();

        info!(
            client = %conn.client.name,
            client_version = %conn.client.version,
            "Initializing session with client"
        );

        if let Some(version) = client_version {
            conn.session.insert("protocolVersion".to_string(), version);
        }
        conn.session.insert("initialized".to_string(), Value::Bool(true));

        to_result(&InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities::default(),
            server_info: self.server_info.clone(),
        })
    }

    async fn handle_tools_list(&self) -> Result<Value, McpError> {
        let tools = self
            .registry
            .list_tools()
            .await
            .into_iter()
            .map(McpTool::from)
            .collect();

        to_result(&ToolsListResult { tools })
    }

    async fn handle_tools_call(&self, ctx: &CallContext, request: &McpRequest) -> Result<Value, McpError> {
        let params = ToolCallParams::from_params(request.params.as_ref())?;
        debug!(tool = %params.name, "Calling tool");

        let result = self
            .registry
            .invoke(ctx, &params.name, params.arguments)
            .await
            .map_err(registry_error)?;

        to_result(&result)
    }
}

/// Map a registry failure onto an error envelope, keeping its message verbatim
pub fn registry_error(e: RegistryError) -> McpError {
    match e {
        RegistryError::TooManyConcurrentCalls(_) => McpError::capacity_exceeded(e.to_string()),
        other => McpError::internal_error(other.to_string()),
    }
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, McpError> {
    serde_json::to_value(value).map_err(|e| {
        error!("Failed to encode result: {}", e);
        McpError::internal_error(e.to_string())
    })
}
