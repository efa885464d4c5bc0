//! STDIO transport implementation.
//!
//! Serves the stored tools as a regular MCP server over stdin/stdout. Logs go
//! to stderr so stdout carries protocol frames only.

use rmcp::ServiceExt;
use tracing::{info, warn};

use super::{TransportError, TransportResult};
use crate::core::GatewayServer;

/// STDIO transport handler.
pub struct StdioTransport;

impl StdioTransport {
    /// Run until the peer closes stdin.
    pub async fn run(server: GatewayServer) -> TransportResult<()> {
        // Startup check only; tools are still resolved per request.
        match server.list_tools().await {
            Ok(tools) => info!("Tool store reachable, {} tools configured", tools.len()),
            Err(e) => warn!("Tool store not usable yet: {}", e),
        }

        let running = server
            .serve(rmcp::transport::stdio())
            .await
            .map_err(|e| TransportError::init(e.to_string()))?;
        info!("Ready - MCP over stdin/stdout");

        let reason = running
            .waiting()
            .await
            .map_err(|e| TransportError::ServiceError(e.to_string()))?;

        info!("STDIO transport finished: {:?}", reason);
        Ok(())
    }
}
