//! Backing store for tool definitions.
//!
//! The gateway only ever reads from the store. A store hands back raw
//! [`ToolRecord`]s whose JSON-valued columns are still text; decoding them
//! into a [`ToolDefinition`](super::ToolDefinition) is the registry's job.

mod memory;
mod mysql;

pub use memory::MemoryToolStore;
pub use mysql::{MySqlToolStore, ensure_schema, upsert_record};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a [`ToolStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or the query failed.
    #[error("{0}")]
    Unavailable(String),

    /// A row came back but could not be decoded.
    #[error("row for '{tool}' is unreadable: {reason}")]
    Data { tool: String, reason: String },
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn data(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Data {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}

/// One row of the `tool_list` table.
///
/// JSON-valued columns (`input_properties`, `input_required`, `headers`) hold
/// serialized text exactly as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRecord {
    pub name: String,
    pub description: Option<String>,
    pub input_type: Option<String>,
    pub input_properties: Option<String>,
    pub input_required: Option<String>,
    pub url: Option<String>,
    pub headers: Option<String>,
    pub method: Option<String>,
    pub output_description: Option<String>,
}

impl ToolRecord {
    /// Start a record with only the name set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_input_type(mut self, input_type: impl Into<String>) -> Self {
        self.input_type = Some(input_type.into());
        self
    }

    pub fn with_properties(mut self, properties: serde_json::Value) -> Self {
        self.input_properties = Some(properties.to_string());
        self
    }

    pub fn with_required(mut self, required: serde_json::Value) -> Self {
        self.input_required = Some(required.to_string());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_headers(mut self, headers: serde_json::Value) -> Self {
        self.headers = Some(headers.to_string());
        self
    }

    pub fn with_output_description(mut self, description: impl Into<String>) -> Self {
        self.output_description = Some(description.into());
        self
    }
}

/// Read-only access to stored tool definitions.
#[async_trait]
pub trait ToolStore: Send + Sync {
    /// All records, ordered by name.
    async fn list_records(&self) -> Result<Vec<ToolRecord>, StoreError>;

    /// The record with exactly this name, if any.
    async fn get_record(&self, name: &str) -> Result<Option<ToolRecord>, StoreError>;
}
