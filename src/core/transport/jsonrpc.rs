//! JSON-RPC envelope handling.
//!
//! The streamable endpoint accepts two request shapes. The body is sniffed
//! exactly once, in [`InboundRequest::from_body`]; everything downstream works
//! on the resolved variant.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::core::GatewayServer;
use crate::domains::tools::ToolError;

pub const JSONRPC_VERSION: &str = "2.0";

pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// JSON-RPC request structure.
///
/// `id` is kept verbatim; an absent id reads as `null`. `jsonrpc` is carried
/// as sent, whatever its type, and never checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<Value>,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC response structure. Exactly one of `result`/`error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Method not found error.
    pub fn method_not_found(id: Value, method: &str) -> Self {
        Self::error(id, METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    /// Invalid request error.
    pub fn invalid_request(id: Value, msg: impl Into<String>) -> Self {
        Self::error(id, INVALID_REQUEST, msg)
    }

    /// Invalid params error.
    pub fn invalid_params(id: Value, msg: impl Into<String>) -> Self {
        Self::error(id, INVALID_PARAMS, msg)
    }

    /// Internal error.
    pub fn internal_error(id: Value, msg: impl Into<String>) -> Self {
        Self::error(id, INTERNAL_ERROR, msg)
    }

    /// Whether this response reports a failure of the gateway itself.
    pub fn is_internal_error(&self) -> bool {
        self.error
            .as_ref()
            .is_some_and(|e| e.code == INTERNAL_ERROR)
    }
}

/// A request to the streamable endpoint, classified once at the boundary.
#[derive(Debug, Clone)]
pub enum InboundRequest {
    /// A JSON-RPC envelope to dispatch.
    Envelope(JsonRpcRequest),

    /// Looked like an envelope (had a `method`) but did not decode as one.
    MalformedEnvelope { id: Value, reason: String },

    /// Anything else: a plain poll for one tool or the full list.
    Poll,
}

impl InboundRequest {
    /// Classify a raw request body. An object with a `method` member is an
    /// envelope; empty, non-JSON or other bodies are polls.
    pub fn from_body(body: &[u8]) -> Self {
        let Ok(value) = serde_json::from_slice::<Value>(body) else {
            return Self::Poll;
        };
        let Some(object) = value.as_object() else {
            return Self::Poll;
        };
        if !object.contains_key("method") {
            return Self::Poll;
        }

        let id = object.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => Self::Envelope(request),
            Err(e) => Self::MalformedEnvelope {
                id,
                reason: e.to_string(),
            },
        }
    }
}

/// Protocol methods understood by the dispatcher, aliases folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Initialize,
    Initialized,
    ListTools,
    CallTool,
}

impl Method {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "initialize" | "mcp:initialize" => Some(Self::Initialize),
            "notifications/initialized" | "mcp:initialized" => Some(Self::Initialized),
            "tools/list" | "mcp:list-tools" => Some(Self::ListTools),
            "tools/call" => Some(Self::CallTool),
            _ => None,
        }
    }
}

/// Process a JSON-RPC request and return the response.
///
/// Stateless: nothing from one call is remembered for the next.
pub async fn process_request(server: &GatewayServer, request: JsonRpcRequest) -> JsonRpcResponse {
    let Some(method) = Method::parse(&request.method) else {
        warn!("Unknown method: {}", request.method);
        return JsonRpcResponse::method_not_found(request.id, &request.method);
    };

    match method {
        Method::Initialize => {
            info!("Processing initialize request");
            JsonRpcResponse::success(request.id, server.initialize_result())
        }
        Method::Initialized => {
            info!("Client sent initialized notification");
            JsonRpcResponse::success(request.id, serde_json::json!({}))
        }
        Method::ListTools => handle_tools_list(server, request).await,
        Method::CallTool => handle_tools_call(server, request).await,
    }
}

/// Handle tools/list request.
async fn handle_tools_list(server: &GatewayServer, request: JsonRpcRequest) -> JsonRpcResponse {
    info!("Processing tools/list request");

    match server.list_tools().await {
        Ok(tools) => {
            let tools: Vec<Value> = tools.iter().map(|t| t.to_mcp_tool()).collect();
            JsonRpcResponse::success(request.id, serde_json::json!({ "tools": tools }))
        }
        Err(e) => JsonRpcResponse::internal_error(request.id, e.to_string()),
    }
}

/// Handle tools/call request.
async fn handle_tools_call(server: &GatewayServer, request: JsonRpcRequest) -> JsonRpcResponse {
    info!("Processing tools/call request");

    let params = request.params.unwrap_or(Value::Null);

    let name = match params.get("name").and_then(Value::as_str) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => return JsonRpcResponse::invalid_params(request.id, "Missing tool name"),
    };

    let arguments = match params.get("arguments") {
        None | Some(Value::Null) => serde_json::json!({}),
        Some(args) => args.clone(),
    };

    match server.call_tool(&name, arguments).await {
        Ok(result) => match serde_json::to_value(&result) {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(e) => JsonRpcResponse::internal_error(request.id, e.to_string()),
        },
        Err(ToolError::NotFound(name)) => {
            JsonRpcResponse::invalid_params(request.id, format!("Tool not found: {name}"))
        }
        Err(e) => JsonRpcResponse::internal_error(request.id, e.to_string()),
    }
}
