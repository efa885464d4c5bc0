//! Audit log of outbound tool traffic.
//!
//! Every upstream request and its outcome is recorded as a single `tracing`
//! event under the [`AUDIT_TARGET`] target, so a subscriber can route them
//! to a dedicated sink. One call here produces exactly one record.

use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use super::config::AuditConfig;

/// Target used for all audit events.
pub const AUDIT_TARGET: &str = "audit";

/// Placeholder written in place of a redacted header value.
pub const REDACTED: &str = "[REDACTED]";

/// Records outbound tool requests and responses.
///
/// Built once at startup and handed to whoever talks to upstreams.
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    redacted_headers: Arc<HashSet<String>>,
}

impl AuditLog {
    pub fn new(config: &AuditConfig) -> Self {
        let redacted_headers = config
            .redact_headers
            .iter()
            .map(|h| h.trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        Self {
            redacted_headers: Arc::new(redacted_headers),
        }
    }

    /// Copy of `headers` with configured names (case-insensitive) masked.
    pub fn redact(&self, headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        headers
            .iter()
            .map(|(name, value)| {
                let value = if self.redacted_headers.contains(&name.to_ascii_lowercase()) {
                    REDACTED.to_string()
                } else {
                    value.clone()
                };
                (name.clone(), value)
            })
            .collect()
    }

    pub fn tool_request(
        &self,
        tool: &str,
        method: &str,
        url: &str,
        headers: &BTreeMap<String, String>,
        query: Option<&[(String, String)]>,
        body: Option<&Value>,
    ) {
        let headers = to_json_text(&self.redact(headers));
        let query = query.map(to_json_text);
        let body = body.map(Value::to_string);
        info!(
            target: AUDIT_TARGET,
            tool,
            method,
            url,
            headers = %headers,
            query = query.as_deref().unwrap_or("null"),
            body = body.as_deref().unwrap_or("null"),
            "tool_request"
        );
    }

    pub fn tool_response(&self, tool: &str, status: u16, is_error: bool, body: &str) {
        info!(
            target: AUDIT_TARGET,
            tool,
            status,
            error = is_error,
            body,
            "tool_response"
        );
    }

    pub fn tool_failure(&self, tool: &str, error: &str) {
        warn!(target: AUDIT_TARGET, tool, error = true, exception = error, "tool_response");
    }
}

fn to_json_text<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}
