//! Tool Invoker - turns a tool call into one upstream HTTP request.
//!
//! [`ToolInvoker::invoke`] never fails: transport errors and non-2xx/3xx
//! responses alike come back as a [`ToolCallResult`] with `is_error` set, so
//! callers can always build a well-formed protocol reply.

use serde::{Deserialize, Serialize};
use serde_json::ser::Formatter;
use serde_json::{Map, Value};
use std::io;
use std::time::Duration;
use tracing::{debug, instrument};

use super::definition::ToolDefinition;
use super::error::ToolError;
use crate::core::audit::AuditLog;
use crate::core::config::InvokerConfig;

// ============================================================================
// Result envelope
// ============================================================================

/// One content block of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> &str {
        match self {
            Self::Text { text } => text,
        }
    }
}

/// Normalized outcome of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub content: Vec<ContentBlock>,
    pub structured_content: Option<Map<String, Value>>,
    pub is_error: bool,
}

impl ToolCallResult {
    /// A successful result with a single text block.
    pub fn success(text: impl Into<String>, structured: Option<Map<String, Value>>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            structured_content: structured,
            is_error: false,
        }
    }

    /// A failed result with a single text block.
    pub fn error(text: impl Into<String>, structured: Option<Map<String, Value>>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            structured_content: structured,
            is_error: true,
        }
    }

    /// Text of the first content block, or `""`.
    pub fn text(&self) -> &str {
        self.content.first().map(ContentBlock::as_text).unwrap_or("")
    }
}

// ============================================================================
// Invoker
// ============================================================================

/// Executes tool calls against their upstream HTTP endpoints.
///
/// Holds one `reqwest::Client`, whose idle pool per host is bounded by
/// configuration. No state from one call is visible to another.
#[derive(Debug, Clone)]
pub struct ToolInvoker {
    client: reqwest::Client,
    audit: AuditLog,
}

impl ToolInvoker {
    pub fn new(config: &InvokerConfig, audit: AuditLog) -> Result<Self, ToolError> {
        // 3xx answers are results in their own right, never followed.
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .redirect(reqwest::redirect::Policy::none());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if !config.use_env_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| ToolError::Client(e.to_string()))?;

        Ok(Self { client, audit })
    }

    /// Call the tool's upstream with `arguments`.
    ///
    /// GET and DELETE carry the arguments as query parameters; every other
    /// method sends them as the JSON body. Binding headers are attached as-is.
    #[instrument(skip(self, tool, arguments), fields(tool = %tool.name))]
    pub async fn invoke(&self, tool: &ToolDefinition, arguments: &Value) -> ToolCallResult {
        let binding = &tool.request;
        if binding.url.trim().is_empty() {
            let message = "Tool is missing request URL";
            self.audit.tool_failure(&tool.name, message);
            return ToolCallResult::error(message, None);
        }

        let (query, body) = if binding.method.uses_query_arguments() {
            (Some(query_pairs(arguments)), None)
        } else {
            (None, Some(arguments))
        };

        self.audit.tool_request(
            &tool.name,
            binding.method.as_str(),
            &binding.url,
            &binding.headers,
            query.as_deref(),
            body,
        );

        let mut request = self
            .client
            .request(binding.method.into(), binding.url.as_str());
        for (name, value) in &binding.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(pairs) = query.as_ref().filter(|p| !p.is_empty()) {
            request = request.query(pairs);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let outcome = match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                response.text().await.map(|text| (status, text))
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok((status, raw)) => {
                let result = normalize_response(status, raw);
                debug!("Upstream answered {} (error: {})", status, result.is_error);
                self.audit
                    .tool_response(&tool.name, status, result.is_error, result.text());
                result
            }
            Err(e) => {
                let reason = error_chain(&e);
                self.audit.tool_failure(&tool.name, &reason);
                ToolCallResult::error(format!("Request failed: {reason}"), None)
            }
        }
    }
}

/// Build a [`ToolCallResult`] from an upstream status and raw body.
///
/// A JSON object body becomes the structured content; any other JSON value
/// is wrapped as `{"data": value}`; a body that is not JSON is passed through
/// as text with no structured content. Status 400 and above marks the result
/// as an error and prefixes the text with the status code.
pub fn normalize_response(status: u16, raw: String) -> ToolCallResult {
    let (text, structured) = match serde_json::from_str::<Value>(&raw) {
        Ok(value) => {
            let text = render_json_text(&value);
            let structured = match value {
                Value::Object(map) => map,
                other => {
                    let mut map = Map::new();
                    map.insert("data".to_string(), other);
                    map
                }
            };
            (text, Some(structured))
        }
        Err(_) => (raw, None),
    };

    if status >= 400 {
        ToolCallResult::error(format!("HTTP {status}: {text}"), structured)
    } else {
        ToolCallResult::success(text, structured)
    }
}

/// Flatten call arguments into query-string pairs.
///
/// Strings go in verbatim, `null` as an empty value, arrays as repeated keys,
/// and everything else as its JSON text. Non-object arguments yield nothing.
pub fn query_pairs(arguments: &Value) -> Vec<(String, String)> {
    let Some(map) = arguments.as_object() else {
        return Vec::new();
    };

    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::Array(items) => {
                pairs.extend(items.iter().map(|item| (key.clone(), scalar_text(item))));
            }
            other => pairs.push((key.clone(), scalar_text(other))),
        }
    }
    pairs
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render JSON on one line with `", "` and `": "` separators.
pub fn render_json_text(value: &Value) -> String {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    match serde::Serialize::serialize(value, &mut ser) {
        Ok(()) => String::from_utf8(buf).unwrap_or_else(|_| value.to_string()),
        Err(_) => value.to_string(),
    }
}

struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
