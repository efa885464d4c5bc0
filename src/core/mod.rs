//! Core module containing shared infrastructure components.
//!
//! This module provides the foundational building blocks for the gateway,
//! including error handling, configuration, audit logging, the server
//! facade and transport layer abstractions.

pub mod audit;
pub mod config;
pub mod error;
pub mod server;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use audit::AuditLog;
pub use config::Config;
pub use error::{Error, Result};
pub use server::GatewayServer;
pub use transport::{TransportConfig, TransportService};
