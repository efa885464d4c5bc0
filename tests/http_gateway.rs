//! End-to-end checks of the HTTP surface against a local upstream.

#![cfg(feature = "http")]

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{RawQuery, State},
    http::{HeaderMap, Method, Request, StatusCode, header},
    routing::any,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

use tool_gateway::core::transport::http::build_router;
use tool_gateway::core::{Config, GatewayServer};
use tool_gateway::domains::tools::{MemoryToolStore, ToolRecord};

/// One request as seen by the upstream.
#[derive(Debug, Clone)]
struct Seen {
    method: Method,
    query: Option<String>,
    content_type: Option<String>,
    authorization: Option<String>,
    body: Bytes,
}

type Recorder = Arc<Mutex<Vec<Seen>>>;

async fn record(
    State(seen): State<Recorder>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let value_of = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    seen.lock().await.push(Seen {
        method,
        query: query.clone(),
        content_type: value_of("content-type"),
        authorization: value_of("authorization"),
        body: body.clone(),
    });

    match serde_json::from_slice::<Value>(&body) {
        Ok(args) if args.get("text").is_some() => Json(json!({ "echo": args["text"] })),
        _ => Json(json!({ "query": query })),
    }
}

/// Start an upstream on an ephemeral port and return its base URL.
async fn spawn_upstream() -> (String, Recorder) {
    let seen = Recorder::default();
    let app = Router::new()
        .route("/echo", any(record))
        .route(
            "/down",
            any(|| async { (StatusCode::SERVICE_UNAVAILABLE, "upstream down") }),
        )
        .route(
            "/moved",
            any(|| async { (StatusCode::FOUND, [(header::LOCATION, "/down")], "moved") }),
        )
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), seen)
}

/// A URL nothing listens on.
async fn refused_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/echo")
}

fn example_tool(url: &str) -> ToolRecord {
    ToolRecord::new("example_tool")
        .with_description("Echo input for testing")
        .with_input_type("object")
        .with_properties(json!({
            "text": {"type": "string", "description": "Input text"},
            "count": {"type": "integer", "description": "Repeat count"}
        }))
        .with_required(json!(["text"]))
        .with_url(url)
        .with_headers(json!({"Authorization": "Bearer test-token"}))
        .with_method("POST")
        .with_output_description("Returns the echoed input")
}

fn gateway(store: Arc<MemoryToolStore>) -> Router {
    let mut config = Config::default();
    config.invoker.use_env_proxy = false;
    config.invoker.timeout_secs = Some(10);
    let server = GatewayServer::with_store(config, store).unwrap();
    build_router(server, false)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn rpc(app: &Router, envelope: Value) -> (StatusCode, Value) {
    let request = Request::post("/streamable")
        .header("content-type", "application/json")
        .body(Body::from(envelope.to_string()))
        .unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Bytes) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

fn call(id: i64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

#[tokio::test]
async fn test_tools_list_envelope() {
    let store = Arc::new(MemoryToolStore::with_records([example_tool(
        "http://127.0.0.1:9/echo",
    )]));
    let app = gateway(store);

    let (status, body) = rpc(&app, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 1);
    let tools = body["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "example_tool");
    assert_eq!(tools[0]["inputSchema"]["type"], "object");
    assert_eq!(tools[0]["inputSchema"]["required"], json!(["text"]));
}

#[tokio::test]
async fn test_tools_call_post_forwards_json_body() {
    let (base, seen) = spawn_upstream().await;
    let store = Arc::new(MemoryToolStore::with_records([example_tool(&format!(
        "{base}/echo"
    ))]));
    let app = gateway(store);

    let (status, body) = rpc(&app, call(2, "example_tool", json!({"text": "hi"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["result"],
        json!({
            "content": [{"type": "text", "text": "{\"echo\": \"hi\"}"}],
            "structuredContent": {"echo": "hi"},
            "isError": false
        })
    );

    let seen = seen.lock().await;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, Method::POST);
    assert_eq!(seen[0].query, None);
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer test-token"));
    assert!(
        seen[0]
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("application/json"))
    );
    let sent: Value = serde_json::from_slice(&seen[0].body).unwrap();
    assert_eq!(sent, json!({"text": "hi"}));
}

#[tokio::test]
async fn test_tools_call_unknown_tool() {
    let app = gateway(Arc::new(MemoryToolStore::new()));

    let (status, body) = rpc(&app, call(3, "missing_tool", json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 3);
    assert_eq!(
        body["error"],
        json!({"code": -32602, "message": "Tool not found: missing_tool"})
    );
    assert!(body.get("result").is_none());
}

#[tokio::test]
async fn test_get_tool_sends_query_without_body() {
    let (base, seen) = spawn_upstream().await;
    let store = Arc::new(MemoryToolStore::with_records([ToolRecord::new("search")
        .with_url(format!("{base}/echo"))
        .with_method("GET")]));
    let app = gateway(store);

    let (status, body) = rpc(&app, call(4, "search", json!({"q": "x"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["isError"], false);
    assert_eq!(body["result"]["structuredContent"], json!({"query": "q=x"}));

    let seen = seen.lock().await;
    assert_eq!(seen[0].method, Method::GET);
    assert_eq!(seen[0].query.as_deref(), Some("q=x"));
    assert!(seen[0].body.is_empty());
    assert_eq!(seen[0].content_type, None);
}

#[tokio::test]
async fn test_unreachable_upstream_is_tool_error() {
    let url = refused_url().await;
    let store = Arc::new(MemoryToolStore::with_records([example_tool(&url)]));
    let app = gateway(store);

    let (status, body) = rpc(&app, call(5, "example_tool", json!({"text": "hi"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("error").is_none());
    assert_eq!(body["result"]["isError"], true);
    assert_eq!(body["result"]["structuredContent"], Value::Null);
    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("Request failed: "), "got {text}");
}

#[tokio::test]
async fn test_upstream_error_status_is_tool_error() {
    let (base, _seen) = spawn_upstream().await;
    let store = Arc::new(MemoryToolStore::with_records([
        example_tool(&format!("{base}/down"))
    ]));
    let app = gateway(store);

    let (status, body) = rpc(&app, call(6, "example_tool", json!({"text": "hi"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["isError"], true);
    assert_eq!(
        body["result"]["content"][0]["text"],
        "HTTP 503: upstream down"
    );
}

#[tokio::test]
async fn test_redirect_is_returned_not_followed() {
    let (base, _seen) = spawn_upstream().await;
    let store = Arc::new(MemoryToolStore::with_records([
        example_tool(&format!("{base}/moved"))
    ]));
    let app = gateway(store);

    let (status, body) = rpc(&app, call(7, "example_tool", json!({"text": "hi"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["isError"], false);
    assert_eq!(body["result"]["content"][0]["text"], "moved");
    assert_eq!(body["result"]["structuredContent"], Value::Null);
}

#[tokio::test]
async fn test_rest_lookup() {
    let store = Arc::new(MemoryToolStore::with_records([example_tool(
        "http://127.0.0.1:9/echo",
    )]));
    let app = gateway(store);

    let (status, body) = get(&app, "/tools/example_tool").await;
    assert_eq!(status, StatusCode::OK);
    let tool: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(tool["name"], "example_tool");
    assert_eq!(tool["request"]["headers"]["Authorization"], "[REDACTED]");

    let (status, _) = get(&app, "/tools/EXAMPLE_TOOL").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(&app, "/tools/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"error": "tool not found"}));

    let (status, body) = get(&app, "/tools").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["tools"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_store_changes_are_visible_without_restart() {
    let store = Arc::new(MemoryToolStore::new());
    let app = gateway(store.clone());

    let (status, _) = get(&app, "/tools/example_tool").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    store.upsert(example_tool("http://127.0.0.1:9/echo")).await;

    let (status, _) = get(&app, "/tools/example_tool").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_store_outage_is_server_error() {
    let store = Arc::new(MemoryToolStore::with_records([example_tool(
        "http://127.0.0.1:9/echo",
    )]));
    store.set_offline(true);
    let app = gateway(store);

    let (status, body) = get(&app, "/tools").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["error"].is_string());

    let (status, _) = get(&app, "/tools/example_tool").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, body) = rpc(&app, json!({"jsonrpc": "2.0", "id": 9, "method": "tools/list"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], -32603);
    assert_eq!(body["id"], 9);
}

#[tokio::test]
async fn test_sse_events() {
    let store = Arc::new(MemoryToolStore::with_records([example_tool(
        "http://127.0.0.1:9/echo",
    )]));
    let app = gateway(store);

    let (status, body) = get(&app, "/sse?tool_name=example_tool").await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.starts_with("event: tool\n"), "got {text}");
    assert_eq!(text.matches("event:").count(), 1);

    let (_, body) = get(&app, "/sse").await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.starts_with("event: tools\n"), "got {text}");

    let (status, body) = get(&app, "/sse?tool_name=nope").await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.starts_with("event: error\n"), "got {text}");
    assert!(text.contains(r#"data: {"error":"tool not found"}"#));
}

#[tokio::test]
async fn test_streamable_chunked_frames() {
    let store = Arc::new(MemoryToolStore::with_records([example_tool(
        "http://127.0.0.1:9/echo",
    )]));
    let app = gateway(store);

    let request = Request::post("/streamable?tool_name=example_tool")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let frames: Vec<Value> = String::from_utf8(body.to_vec())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0], json!({"type": "start"}));
    assert_eq!(frames[1]["type"], "tool");
    assert_eq!(frames[1]["data"]["name"], "example_tool");
    assert_eq!(frames[2], json!({"type": "end"}));

    let request = Request::post("/streamable?tool_name=nope")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let frames: Vec<Value> = String::from_utf8(body.to_vec())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(
        frames[1],
        json!({"type": "error", "data": {"error": "tool not found"}})
    );
}

#[tokio::test]
async fn test_envelope_wins_over_tool_name() {
    let store = Arc::new(MemoryToolStore::with_records([example_tool(
        "http://127.0.0.1:9/echo",
    )]));
    let app = gateway(store);

    let request = Request::post("/streamable?tool_name=example_tool")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"jsonrpc":"2.0","id":"abc","method":"mcp:list-tools"}"#))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["id"], "abc");
    assert_eq!(body["result"]["tools"][0]["name"], "example_tool");
}

#[tokio::test]
async fn test_envelope_protocol_errors() {
    let app = gateway(Arc::new(MemoryToolStore::new()));

    let (status, body) = rpc(&app, json!({"id": 7, "method": 5})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 7);
    assert_eq!(body["error"]["code"], -32600);

    let (_, body) = rpc(&app, json!({"jsonrpc": "2.0", "id": 8, "method": "resources/list"})).await;
    assert_eq!(
        body["error"],
        json!({"code": -32601, "message": "Method not found: resources/list"})
    );

    let (_, body) = rpc(&app, json!({"jsonrpc": "2.0", "method": "tools/call", "params": {}})).await;
    assert_eq!(body["id"], Value::Null);
    assert_eq!(body["error"]["code"], -32602);
}

#[tokio::test]
async fn test_initialize_is_stateless() {
    let app = gateway(Arc::new(MemoryToolStore::new()));

    let (_, body) = rpc(&app, json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"})).await;
    assert_eq!(body["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(body["result"]["capabilities"], json!({"tools": {}}));
    assert_eq!(body["result"]["serverInfo"]["name"], "mcp-server");

    // No handshake needed before listing.
    let fresh = gateway(Arc::new(MemoryToolStore::new()));
    let (status, body) = rpc(&fresh, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["tools"], json!([]));
}

#[tokio::test]
async fn test_concurrent_calls_keep_their_arguments() {
    let (base, seen) = spawn_upstream().await;
    let store = Arc::new(MemoryToolStore::with_records([example_tool(&format!(
        "{base}/echo"
    ))]));
    let app = gateway(store);

    let calls = (0..8).map(|i| {
        let app = app.clone();
        async move {
            let (_, body) = rpc(&app, call(i, "example_tool", json!({"text": format!("msg-{i}")}))).await;
            (i, body)
        }
    });
    let replies = futures::future::join_all(calls).await;

    for (i, body) in replies {
        assert_eq!(body["id"], i);
        assert_eq!(body["result"]["structuredContent"]["echo"], format!("msg-{i}"));
    }
    assert_eq!(seen.lock().await.len(), 8);
}

#[tokio::test]
async fn test_health() {
    let app = gateway(Arc::new(MemoryToolStore::new()));
    let response = tokio_test::assert_ok!(
        app.oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
    );
    assert_eq!(response.status(), StatusCode::OK);
}
