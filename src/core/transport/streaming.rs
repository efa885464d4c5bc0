//! Streaming delivery of tool lookups.
//!
//! Two framings over the same lookup (one tool or all tools), both answered
//! in full before the first byte goes out:
//! - an SSE stream carrying exactly one `tool`, `tools` or `error` event;
//! - a chunked JSON-lines body of `start`, payload and `end` frames.

use axum::{
    body::Body,
    http::{StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
};
use bytes::Bytes;
use futures::{Stream, stream};
use serde_json::{Value, json};
use std::convert::Infallible;

use crate::core::GatewayServer;
use crate::domains::tools::{ToolDefinition, ToolError};

/// Body of every not-found answer on the REST and streaming paths.
pub const TOOL_NOT_FOUND: &str = "tool not found";

/// Outcome of a single-tool or full-list lookup.
#[derive(Debug, Clone)]
pub enum Lookup {
    Tool(ToolDefinition),
    Tools(Vec<ToolDefinition>),
    NotFound,
}

impl Lookup {
    /// Look up `tool_name`, or list everything when no name is given.
    /// An empty name counts as no name.
    pub async fn resolve(
        server: &GatewayServer,
        tool_name: Option<&str>,
    ) -> Result<Self, ToolError> {
        match tool_name.filter(|n| !n.is_empty()) {
            Some(name) => Ok(server
                .get_tool(name)
                .await?
                .map_or(Self::NotFound, Self::Tool)),
            None => Ok(Self::Tools(server.list_tools().await?)),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Tool(_) => "tool",
            Self::Tools(_) => "tools",
            Self::NotFound => "error",
        }
    }

    fn data(&self) -> Value {
        match self {
            Self::Tool(tool) => json!(tool),
            Self::Tools(tools) => json!(tools),
            Self::NotFound => json!({ "error": TOOL_NOT_FOUND }),
        }
    }
}

/// One-shot SSE stream for a lookup. The stream ends after its only event.
pub fn event_stream(lookup: Lookup) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send> {
    let event = Event::default()
        .event(lookup.kind())
        .data(lookup.data().to_string());
    Sse::new(stream::iter([Ok(event)]))
}

/// The three JSON lines of the chunked framing.
pub fn chunked_frames(lookup: &Lookup) -> [Bytes; 3] {
    let payload = json!({ "type": lookup.kind(), "data": lookup.data() });
    [json!({ "type": "start" }), payload, json!({ "type": "end" })]
        .map(|frame| Bytes::from(format!("{frame}\n")))
}

/// Chunked-framing response. A miss is still framed, under status 404.
pub fn chunked_response(lookup: Lookup) -> Response {
    let status = match lookup {
        Lookup::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::OK,
    };
    let frames = chunked_frames(&lookup).map(Ok::<_, Infallible>);

    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Body::from_stream(stream::iter(frames)),
    )
        .into_response()
}
