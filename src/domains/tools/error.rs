//! Tool-specific error types.

use thiserror::Error;

use super::store::StoreError;

/// Errors that can occur during tool operations.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool was not found.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// The backing store could not be reached.
    #[error("Tool store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored definition could not be decoded.
    #[error("Corrupt definition for tool '{tool}': {reason}")]
    DataError { tool: String, reason: String },

    /// A definition was rejected while being built.
    #[error("Invalid tool definition: {0}")]
    InvalidDefinition(String),

    /// The outbound HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl ToolError {
    /// Create a new "not found" error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a new "data error" for the given tool.
    pub fn data(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataError {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Create a new "invalid definition" error.
    pub fn invalid_definition(msg: impl Into<String>) -> Self {
        Self::InvalidDefinition(msg.into())
    }

    /// Whether this error means the registry itself is broken, as opposed to
    /// a lookup miss.
    pub fn is_server_failure(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::DataError { .. } | Self::Client(_)
        )
    }
}

impl From<StoreError> for ToolError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StoreError::Data { tool, reason } => Self::DataError { tool, reason },
        }
    }
}
