//! Transport layer for the gateway.
//!
//! This module provides different transport implementations:
//! - **HTTP**: REST, SSE and streamable endpoints plus JSON-RPC over POST - feature: `http`
//! - **STDIO**: Standard input/output MCP session - feature: `stdio`
//!
//! Each transport handles the connection lifecycle and delegates tool
//! lookups and calls to the [`GatewayServer`](crate::core::GatewayServer).

mod config;
mod error;
mod service;

#[cfg(feature = "http")]
pub mod http;

pub mod jsonrpc;

#[cfg(feature = "http")]
pub mod streaming;

#[cfg(feature = "stdio")]
pub mod stdio;

pub use config::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use service::TransportService;

#[cfg(feature = "http")]
pub use config::HttpConfig;
