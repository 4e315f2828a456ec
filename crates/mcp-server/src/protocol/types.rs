//! MCP protocol message types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use weave_core::ToolInfo;

/// JSON-RPC version string
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol version
pub const MCP_VERSION: &str = "2025-06-18";

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_INITIALIZED: &str = "notifications/initialized";
pub const METHOD_TOOLS_LIST: &str = "tools/list";
pub const METHOD_TOOLS_CALL: &str = "tools/call";
pub const METHOD_RESOURCES_LIST: &str = "resources/list";
pub const METHOD_PROMPTS_LIST: &str = "prompts/list";
pub const METHOD_ROOTS_LIST: &str = "roots/list";

/// Inbound request envelope
#[derive(Debug, Clone, PartialEq)]
pub struct McpRequest {
    pub method: String,
    pub params: Option<Value>,
    /// Echoed back in the response; `null` when the client sent none
    pub id: Value,
}

impl McpRequest {
    /// Decode a request body.
    ///
    /// Malformed JSON is a parse error; a document without a string `method`
    /// is an invalid request.
    pub fn parse(body: &[u8]) -> Result<Self, McpError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|_| McpError::parse_error("Invalid JSON"))?;
        Self::from_value(value)
    }

    pub fn from_value(mut value: Value) -> Result<Self, McpError> {
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| McpError::invalid_request("Missing or invalid method"))?;

        let params = value.get_mut("params").map(Value::take);
        let id = value.get_mut("id").map(Value::take).unwrap_or(Value::Null);

        Ok(Self { method, params, id })
    }

    /// Client identity announced in `params.clientInfo`
    pub fn client_info(&self) -> ClientInfo {
        self.params
            .as_ref()
            .and_then(|p| p.get("clientInfo"))
            .map(|client| {
                let field = |key: &str, default: &str| {
                    client
                        .get(key)
                        .and_then(Value::as_str)
                        .unwrap_or(default)
                        .to_string()
                };
                ClientInfo {
                    name: field("name", ClientInfo::UNKNOWN_NAME),
                    version: field("version", ClientInfo::DEFAULT_VERSION),
                }
            })
            .unwrap_or_default()
    }
}

/// Outbound response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
    pub id: Value,
}

impl McpResponse {
    /// Create a success response
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create an error response; error envelopes never carry the request id
    pub fn failure(error: McpError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id: Value::Null,
        }
    }
}

/// MCP error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
}

impl McpError {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const CAPACITY_EXCEEDED: i32 = -32000;

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(Self::PARSE_ERROR, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_REQUEST, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(Self::INTERNAL_ERROR, message)
    }

    pub fn method_not_supported(method: &str) -> Self {
        Self::internal_error(format!("unsupported method: {}", method))
    }

    pub fn capacity_exceeded(message: impl Into<String>) -> Self {
        Self::new(Self::CAPACITY_EXCEEDED, message)
    }
}

impl std::fmt::Display for McpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for McpError {}

/// MCP tool definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl From<ToolInfo> for McpTool {
    fn from(info: ToolInfo) -> Self {
        Self {
            name: info.name,
            description: info.description,
            input_schema: info.input_schema,
        }
    }
}

/// Client info
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

impl ClientInfo {
    pub const UNKNOWN_NAME: &'static str = "unknown";
    pub const DEFAULT_VERSION: &'static str = "1.0.0";

    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self::new(Self::UNKNOWN_NAME, Self::DEFAULT_VERSION)
    }
}

/// Initialize result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: super::capabilities::ServerCapabilities,
    pub server_info: ServerInfo,
}

/// Server info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "Weave-Toolkit".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Tools list result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsListResult {
    pub tools: Vec<McpTool>,
}

/// Tool call params
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallParams {
    pub name: String,
    pub arguments: Value,
}

impl ToolCallParams {
    /// Extract `name` and `arguments` from request params.
    /// Absent or `null` arguments become an empty object.
    pub fn from_params(params: Option<&Value>) -> Result<Self, McpError> {
        let params = params
            .and_then(Value::as_object)
            .ok_or_else(|| McpError::internal_error("invalid params"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::internal_error("missing or invalid tool name"))?
            .to_string();

        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => Value::Object(serde_json::Map::new()),
            Some(args) => args.clone(),
        };

        Ok(Self { name, arguments })
    }
}
