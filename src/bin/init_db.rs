//! Creates the `tool_list` table and seeds it with `example_tool`.
//!
//! Connection settings come from the same `MCP_DB_*` variables the gateway
//! reads. Running it again overwrites `example_tool` in place.

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tool_gateway::core::config::StoreConfig;
use tool_gateway::domains::tools::store::{MySqlToolStore, ToolRecord, ensure_schema, upsert_record};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = StoreConfig::from_env();
    let store = MySqlToolStore::new(&config);

    ensure_schema(store.pool())
        .await
        .context("failed to create tool_list")?;
    upsert_record(store.pool(), &example_tool())
        .await
        .context("failed to seed example_tool")?;

    info!(
        "DB initialized on {}:{}, database={}",
        config.host, config.port, config.database
    );
    Ok(())
}

fn example_tool() -> ToolRecord {
    ToolRecord::new("example_tool")
        .with_description("Echo input for testing")
        .with_input_type("object")
        .with_properties(json!({
            "text": {"type": "string", "description": "Input text"},
            "count": {"type": "integer", "description": "Repeat count"}
        }))
        .with_required(json!(["text"]))
        .with_url("https://api.example.com/v1/echo")
        .with_headers(json!({"Authorization": "Bearer <token>"}))
        .with_method("POST")
        .with_output_description("Returns the echoed input")
}
