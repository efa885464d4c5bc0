//! Tool Gateway Library
//!
//! This crate exposes HTTP APIs stored in a MySQL table as MCP tools. Tool
//! definitions are read from the store on every request, so rows added or
//! changed while the gateway runs are picked up without a restart.
//!
//! # Architecture
//!
//! - **core**: configuration, error handling, audit logging, the gateway
//!   server and its transports (HTTP REST/SSE/streamable, MCP over STDIO)
//! - **domains**: business logic organized by bounded contexts
//!   - **tools**: stored tool definitions, the registry reading them and the
//!     invoker forwarding calls to the upstream APIs
//!
//! # Example
//!
//! ```rust,no_run
//! use tool_gateway::core::{Config, GatewayServer, TransportService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let server = GatewayServer::new(config.clone())?;
//!     TransportService::new(config.transport).run(server).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, GatewayServer, Result};
