//! Tools domain module.
//!
//! Tools are not compiled into the gateway. Each one is a row in the backing
//! store describing an upstream HTTP endpoint, and is resolved by name on
//! every request.
//!
//! ## Architecture
//!
//! - `store/` - Raw access to stored rows (MySQL, in-memory)
//! - `definition.rs` - Strict decoding of a row into a [`ToolDefinition`]
//! - `registry.rs` - List/get over the store, no caching
//! - `invoker.rs` - Outbound HTTP call and result normalization
//! - `error.rs` - Tool-specific error types

pub mod definition;
mod error;
pub mod invoker;
mod registry;
pub mod store;

pub use definition::{InputSchema, RequestBinding, RequestMethod, ToolDefinition};
pub use error::ToolError;
pub use invoker::{ContentBlock, ToolCallResult, ToolInvoker};
pub use registry::ToolRegistry;
pub use store::{MemoryToolStore, MySqlToolStore, StoreError, ToolRecord, ToolStore};
