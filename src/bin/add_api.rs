//! Minimal arithmetic API, handy as a real upstream for a registered tool.
//!
//! `POST /add {"a": 1, "b": 2}` answers `{"result": 3.0}`. Operands may be
//! JSON numbers or numeric strings. Listens on `ADD_API_ADDR`
//! (default `127.0.0.1:8000`).

use anyhow::{Context, Result};
use axum::{Json, Router, http::StatusCode, routing::post};
use serde_json::{Map, Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let addr = std::env::var("ADD_API_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("add-api listening on {}", addr);
    axum::serve(listener, router()).await?;
    Ok(())
}

fn router() -> Router {
    Router::new().route("/add", post(add_numbers))
}

async fn add_numbers(Json(payload): Json<Map<String, Value>>) -> (StatusCode, Json<Value>) {
    match add(&payload) {
        Ok(result) => (StatusCode::OK, Json(json!({ "result": result }))),
        Err(detail) => (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))),
    }
}

fn add(payload: &Map<String, Value>) -> Result<f64, &'static str> {
    let (Some(a), Some(b)) = (operand(payload, "a"), operand(payload, "b")) else {
        return Err("Missing 'a' or 'b'");
    };
    match (as_number(a), as_number(b)) {
        (Some(a), Some(b)) => Ok(a + b),
        _ => Err("'a' and 'b' must be numbers"),
    }
}

fn operand<'a>(payload: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    payload.get(key).filter(|v| !v.is_null())
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
