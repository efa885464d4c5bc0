//! Gateway server implementation and lifecycle management.
//!
//! [`GatewayServer`] ties the tool registry and the tool invoker together and
//! is shared by every transport. It holds no per-client state: an
//! `initialize` handshake changes nothing, and every request resolves tools
//! from the store afresh.

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

use super::audit::AuditLog;
use super::config::Config;
use super::error::Result;
use crate::domains::tools::{
    MySqlToolStore, ToolCallResult, ToolDefinition, ToolError, ToolInvoker, ToolRegistry,
    ToolStore,
};

/// MCP protocol revision announced by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// The gateway: tool lookup plus upstream invocation.
#[derive(Clone)]
pub struct GatewayServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Read-only access to stored tool definitions.
    registry: ToolRegistry,

    /// Upstream HTTP caller.
    invoker: ToolInvoker,

    /// Also masks header values in definitions handed to clients.
    audit: AuditLog,
}

impl GatewayServer {
    /// Create a gateway reading tools from the configured MySQL store.
    ///
    /// The store's pool is opened lazily; this must run inside a Tokio
    /// runtime but does not need the database to be up.
    pub fn new(config: Config) -> Result<Self> {
        let store = Arc::new(MySqlToolStore::new(&config.store));
        Self::with_store(config, store)
    }

    /// Create a gateway over an arbitrary store.
    pub fn with_store(config: Config, store: Arc<dyn ToolStore>) -> Result<Self> {
        let audit = AuditLog::new(&config.audit);
        let invoker = ToolInvoker::new(&config.invoker, audit.clone())?;

        Ok(Self {
            config: Arc::new(config),
            registry: ToolRegistry::new(store),
            invoker,
            audit,
        })
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Fixed `initialize` result. Creates no session.
    pub fn initialize_result(&self) -> Value {
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": self.name(),
                "version": self.version()
            }
        })
    }

    /// List all tools, sorted by name.
    ///
    /// Binding header values named in the redaction list are masked, here
    /// and in [`get_tool`](Self::get_tool); calls still send the real ones.
    pub async fn list_tools(&self) -> std::result::Result<Vec<ToolDefinition>, ToolError> {
        let tools = self.registry.list().await?;
        Ok(tools.into_iter().map(|t| self.published(t)).collect())
    }

    /// Look up a single tool.
    pub async fn get_tool(
        &self,
        name: &str,
    ) -> std::result::Result<Option<ToolDefinition>, ToolError> {
        Ok(self.registry.get(name).await?.map(|t| self.published(t)))
    }

    fn published(&self, mut tool: ToolDefinition) -> ToolDefinition {
        tool.request.headers = self.audit.redact(&tool.request.headers);
        tool
    }

    /// Resolve `name` and call its upstream with `arguments`.
    ///
    /// Only registry problems surface as `Err`; upstream failures are inside
    /// the returned result.
    #[instrument(skip(self, arguments))]
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> std::result::Result<ToolCallResult, ToolError> {
        let tool = self
            .registry
            .get(name)
            .await?
            .ok_or_else(|| ToolError::not_found(name))?;

        info!(name, args = %arguments, "tool_call");
        let result = self.invoker.invoke(&tool, &arguments).await;
        info!(name, is_error = result.is_error, result = result.text(), "tool_result");

        Ok(result)
    }
}

// ============================================================================
// STDIO Transport Support (rmcp)
// ============================================================================

#[cfg(feature = "stdio")]
mod mcp {
    use rmcp::{
        ErrorData as McpError, RoleServer, ServerHandler, model::*, service::RequestContext,
    };
    use std::sync::Arc;
    use tracing::{info, instrument};

    use super::GatewayServer;
    use crate::domains::tools::{ToolCallResult, ToolDefinition, ToolError};

    fn to_rmcp_tool(def: &ToolDefinition) -> Tool {
        let input_schema = match serde_json::to_value(&def.input_schema) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => JsonObject::new(),
        };
        Tool {
            name: def.name.clone().into(),
            description: Some(def.description.clone().into()),
            input_schema: Arc::new(input_schema),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    fn to_rmcp_result(result: ToolCallResult) -> CallToolResult {
        let content = result
            .content
            .iter()
            .map(|block| Content::text(block.as_text().to_string()))
            .collect();
        let mut call_result = if result.is_error {
            CallToolResult::error(content)
        } else {
            CallToolResult::success(content)
        };
        call_result.structured_content = result.structured_content.map(serde_json::Value::Object);
        call_result
    }

    fn to_mcp_error(err: ToolError) -> McpError {
        if err.is_server_failure() {
            McpError::internal_error(err.to_string(), None)
        } else {
            McpError::invalid_params(err.to_string(), None)
        }
    }

    impl ServerHandler for GatewayServer {
        fn get_info(&self) -> ServerInfo {
            ServerInfo {
                instructions: Some(
                    "Gateway to HTTP tools configured in the tool store.".to_string(),
                ),
                capabilities: ServerCapabilities::builder().enable_tools().build(),
                ..Default::default()
            }
        }

        #[instrument(skip(self, _context))]
        async fn list_tools(
            &self,
            _request: Option<PaginatedRequestParam>,
            _context: RequestContext<RoleServer>,
        ) -> Result<ListToolsResult, McpError> {
            info!("Listing tools");
            let tools = GatewayServer::list_tools(self).await.map_err(to_mcp_error)?;
            Ok(ListToolsResult::with_all_items(
                tools.iter().map(to_rmcp_tool).collect(),
            ))
        }

        #[instrument(skip(self, _context))]
        async fn call_tool(
            &self,
            request: CallToolRequestParam,
            _context: RequestContext<RoleServer>,
        ) -> Result<CallToolResult, McpError> {
            let arguments = serde_json::Value::Object(request.arguments.unwrap_or_default());
            GatewayServer::call_tool(self, &request.name, arguments)
                .await
                .map(to_rmcp_result)
                .map_err(to_mcp_error)
        }
    }
}
