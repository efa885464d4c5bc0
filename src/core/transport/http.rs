//! HTTP transport implementation.
//!
//! Endpoints:
//! - `GET /tools` and `GET /tools/{name}`: plain REST listing/inspection
//! - `GET /sse?tool_name=`: one-event SSE stream
//! - `POST /streamable?tool_name=`: JSON-RPC dispatch when the body is an
//!   envelope, chunked `start`/payload/`end` framing otherwise
//! - `GET /health`, `GET /`: service info

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};

use super::jsonrpc::{InboundRequest, JsonRpcResponse, process_request};
use super::streaming::{self, Lookup, TOOL_NOT_FOUND};
use super::{TransportError, TransportResult, config::HttpConfig};
use crate::core::GatewayServer;
use crate::domains::tools::ToolError;

/// HTTP transport handler.
pub struct HttpTransport {
    config: HttpConfig,
}

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    server: GatewayServer,
}

/// Optional `?tool_name=` selector.
#[derive(Debug, Default, Deserialize)]
pub struct ToolQuery {
    pub tool_name: Option<String>,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given config.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Bind the listener. Returns the address actually bound, which differs
    /// from [`address`](Self::address) when the port is 0.
    pub async fn bind(&self) -> TransportResult<(TcpListener, SocketAddr)> {
        let addr = self.address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;
        let local = listener
            .local_addr()
            .map_err(|e| TransportError::bind(&addr, e))?;
        Ok((listener, local))
    }

    /// Run the HTTP transport.
    pub async fn run(self, server: GatewayServer) -> TransportResult<()> {
        let (listener, addr) = self.bind().await?;
        let app = build_router(server, self.config.enable_cors);

        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!("Ready - listening on {} (CORS {})", addr, cors_status);
        info!("  → REST:       GET /tools, GET /tools/{{name}}");
        info!("  → SSE:        GET /sse?tool_name=");
        info!("  → Streamable: POST /streamable (JSON-RPC or framed)");
        info!("  → Health:     GET /health");

        axum::serve(listener, app)
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;

        Ok(())
    }
}

/// Build the gateway router.
pub fn build_router(server: GatewayServer, enable_cors: bool) -> Router {
    let mut app = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/tools", get(list_tools))
        .route("/tools/{name}", get(get_tool))
        .route("/sse", get(handle_sse))
        .route("/streamable", post(handle_streamable))
        .with_state(AppState { server })
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Root handler - provides API info.
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": state.server.name(),
        "version": state.server.version(),
        "transport": "HTTP",
        "endpoints": {
            "tools": "/tools",
            "tool": "/tools/{name}",
            "sse": "/sse",
            "streamable": "/streamable",
            "health": "/health"
        },
        "protocol": "JSON-RPC 2.0"
    }))
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// `GET /tools`
#[instrument(skip_all)]
async fn list_tools(State(state): State<AppState>) -> Response {
    match state.server.list_tools().await {
        Ok(tools) => Json(serde_json::json!({ "tools": tools })).into_response(),
        Err(e) => server_error(e),
    }
}

/// `GET /tools/{name}`
#[instrument(skip_all, fields(name = %name))]
async fn get_tool(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.server.get_tool(&name).await {
        Ok(Some(tool)) => Json(tool).into_response(),
        Ok(None) => not_found(),
        Err(e) => server_error(e),
    }
}

/// `GET /sse`
#[instrument(skip_all, fields(tool_name = ?query.tool_name))]
async fn handle_sse(State(state): State<AppState>, Query(query): Query<ToolQuery>) -> Response {
    match Lookup::resolve(&state.server, query.tool_name.as_deref()).await {
        Ok(lookup) => streaming::event_stream(lookup).into_response(),
        Err(e) => server_error(e),
    }
}

/// `POST /streamable`
#[instrument(skip_all, fields(method))]
async fn handle_streamable(
    State(state): State<AppState>,
    Query(query): Query<ToolQuery>,
    body: Bytes,
) -> Response {
    match InboundRequest::from_body(&body) {
        InboundRequest::Envelope(request) => {
            tracing::Span::current().record("method", request.method.as_str());
            info!("Received JSON-RPC request: {}", request.method);
            rpc_reply(process_request(&state.server, request).await)
        }
        InboundRequest::MalformedEnvelope { id, reason } => {
            rpc_reply(JsonRpcResponse::invalid_request(id, format!("Invalid Request: {reason}")))
        }
        InboundRequest::Poll => {
            match Lookup::resolve(&state.server, query.tool_name.as_deref()).await {
                Ok(lookup) => streaming::chunked_response(lookup),
                Err(e) => server_error(e),
            }
        }
    }
}

/// JSON-RPC replies are 200 unless the gateway itself failed.
fn rpc_reply(response: JsonRpcResponse) -> Response {
    let status = if response.is_internal_error() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (status, Json(response)).into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": TOOL_NOT_FOUND })),
    )
        .into_response()
}

fn server_error(err: ToolError) -> Response {
    error!("Registry failure: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": err.to_string() })),
    )
        .into_response()
}
