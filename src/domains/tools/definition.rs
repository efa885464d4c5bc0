//! Tool definitions as served by the gateway.
//!
//! A [`ToolDefinition`] is decoded from a raw [`ToolRecord`] on every read.
//! Decoding is strict: a JSON-valued column that does not parse is a
//! [`ToolError::DataError`], never a silent default.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

use super::error::ToolError;
use super::store::ToolRecord;

/// The only top-level schema type the gateway exposes.
pub const OBJECT_SCHEMA_TYPE: &str = "object";

/// A named HTTP-backed tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: InputSchema,
    pub request: RequestBinding,
    #[serde(rename = "outputSchema")]
    pub output: OutputDescription,
}

/// Declared arguments of a tool.
///
/// `required` is informational: the gateway never checks it against the
/// arguments of a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: Map<String, Value>,
    pub required: Vec<String>,
}

impl Default for InputSchema {
    fn default() -> Self {
        Self {
            schema_type: OBJECT_SCHEMA_TYPE.to_string(),
            properties: Map::new(),
            required: Vec::new(),
        }
    }
}

impl InputSchema {
    /// Names listed in `required` that have no entry in `properties`.
    pub fn undeclared_required(&self) -> Vec<&str> {
        self.required
            .iter()
            .filter(|name| !self.properties.contains_key(name.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// Where and how the upstream is called.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBinding {
    pub url: String,
    pub method: RequestMethod,
    pub headers: BTreeMap<String, String>,
}

/// Free-text description of the upstream's response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputDescription {
    pub description: String,
}

/// HTTP method of a tool binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl RequestMethod {
    /// Parse a stored method name. Case is ignored; anything unrecognized,
    /// empty or missing becomes POST.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|m| m.trim().to_ascii_uppercase()).as_deref() {
            Some("GET") => Self::Get,
            Some("PUT") => Self::Put,
            Some("PATCH") => Self::Patch,
            Some("DELETE") => Self::Delete,
            Some("HEAD") => Self::Head,
            Some("OPTIONS") => Self::Options,
            _ => Self::Post,
        }
    }

    /// Whether call arguments travel in the query string instead of a JSON body.
    pub fn uses_query_arguments(self) -> bool {
        matches!(self, Self::Get | Self::Delete)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RequestMethod> for reqwest::Method {
    fn from(method: RequestMethod) -> Self {
        match method {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Post => reqwest::Method::POST,
            RequestMethod::Put => reqwest::Method::PUT,
            RequestMethod::Patch => reqwest::Method::PATCH,
            RequestMethod::Delete => reqwest::Method::DELETE,
            RequestMethod::Head => reqwest::Method::HEAD,
            RequestMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

impl ToolDefinition {
    /// Decode a stored row.
    ///
    /// The stored schema type is ignored and always surfaced as `"object"`.
    /// Required names missing from `properties` are reported with `warn!`
    /// but accepted.
    pub fn from_record(record: ToolRecord) -> Result<Self, ToolError> {
        let name = record.name;
        if name.is_empty() {
            return Err(ToolError::invalid_definition("tool name is empty"));
        }

        let properties: Map<String, Value> =
            parse_column(&name, "inputSchema_properties", record.input_properties, "{}")?;
        let required: Vec<String> =
            parse_column(&name, "inputSchema_required", record.input_required, "[]")?;
        let headers: BTreeMap<String, String> =
            parse_column(&name, "req_header", record.headers, "{}")?;

        let input_schema = InputSchema {
            schema_type: OBJECT_SCHEMA_TYPE.to_string(),
            properties,
            required,
        };

        let undeclared = input_schema.undeclared_required();
        if !undeclared.is_empty() {
            warn!(
                tool = %name,
                "Required parameters not declared in properties: {}",
                undeclared.join(", ")
            );
        }

        Ok(Self {
            description: record.description.unwrap_or_default(),
            input_schema,
            request: RequestBinding {
                url: record.url.unwrap_or_default(),
                method: RequestMethod::parse(record.method.as_deref()),
                headers,
            },
            output: OutputDescription {
                description: record.output_description.unwrap_or_default(),
            },
            name,
        })
    }

    /// The MCP `tools/list` entry for this tool.
    pub fn to_mcp_tool(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }
}

/// Parse a JSON-valued text column, treating NULL and empty text as `fallback`.
fn parse_column<T>(
    tool: &str,
    column: &str,
    raw: Option<String>,
    fallback: &str,
) -> Result<T, ToolError>
where
    T: serde::de::DeserializeOwned,
{
    let text = raw.filter(|s| !s.trim().is_empty());
    serde_json::from_str(text.as_deref().unwrap_or(fallback))
        .map_err(|e| ToolError::data(tool, format!("column {column}: {e}")))
}
