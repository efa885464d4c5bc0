//! MySQL-backed tool store.
//!
//! Reads go through a bounded connection pool that is opened lazily, so the
//! gateway can start before the database is reachable. Every read still
//! checks out its own connection and returns it when done.

use async_trait::async_trait;
use sqlx::Row;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use std::time::Duration;
use tracing::debug;

use super::{StoreError, ToolRecord, ToolStore};
use crate::core::config::StoreConfig;

const SELECT_COLUMNS: &str = "SELECT tool_name, description, inputSchema_type, \
     CAST(inputSchema_properties AS CHAR) AS inputSchema_properties, \
     CAST(inputSchema_required AS CHAR) AS inputSchema_required, \
     req_url, CAST(req_header AS CHAR) AS req_header, req_method, outputSchema_description \
     FROM tool_list";

const WHERE_EXACT_NAME: &str = "WHERE tool_name = CAST(? AS BINARY)";

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tool_list (
    tool_name VARCHAR(255) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin PRIMARY KEY,
    description TEXT NOT NULL,
    inputSchema_type VARCHAR(64) NOT NULL,
    inputSchema_properties JSON NOT NULL,
    inputSchema_required JSON NOT NULL,
    req_url TEXT NOT NULL,
    req_header JSON NOT NULL,
    req_method VARCHAR(16) NOT NULL,
    outputSchema_description TEXT NOT NULL
)
"#;

const UPSERT: &str = r#"
INSERT INTO tool_list (
    tool_name, description, inputSchema_type, inputSchema_properties,
    inputSchema_required, req_url, req_header, req_method, outputSchema_description
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
ON DUPLICATE KEY UPDATE
    description = VALUES(description),
    inputSchema_type = VALUES(inputSchema_type),
    inputSchema_properties = VALUES(inputSchema_properties),
    inputSchema_required = VALUES(inputSchema_required),
    req_url = VALUES(req_url),
    req_header = VALUES(req_header),
    req_method = VALUES(req_method),
    outputSchema_description = VALUES(outputSchema_description)
"#;

/// [`ToolStore`] reading the `tool_list` table.
#[derive(Debug, Clone)]
pub struct MySqlToolStore {
    pool: MySqlPool,
}

impl MySqlToolStore {
    /// Create a store from connection settings. No connection is made until
    /// the first read.
    pub fn new(config: &StoreConfig) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_lazy_with(options);

        Self { pool }
    }

    /// The underlying pool, for administrative utilities.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl ToolStore for MySqlToolStore {
    async fn list_records(&self) -> Result<Vec<ToolRecord>, StoreError> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY tool_name"))
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

        debug!("Fetched {} tool rows", rows.len());
        rows.iter().map(decode_row).collect()
    }

    async fn get_record(&self, name: &str) -> Result<Option<ToolRecord>, StoreError> {
        // Binary comparison: tables created with a `_ci` collation would
        // otherwise match names case-insensitively.
        let row = sqlx::query(&format!("{SELECT_COLUMNS} {WHERE_EXACT_NAME}"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        row.as_ref().map(decode_row).transpose()
    }
}

/// Create the `tool_list` table if it does not exist yet.
pub async fn ensure_schema(pool: &MySqlPool) -> Result<(), StoreError> {
    sqlx::query(CREATE_TABLE)
        .execute(pool)
        .await
        .map_err(unavailable)?;
    Ok(())
}

/// Insert a record, or overwrite the existing row with the same name.
pub async fn upsert_record(pool: &MySqlPool, record: &ToolRecord) -> Result<(), StoreError> {
    sqlx::query(UPSERT)
        .bind(&record.name)
        .bind(record.description.as_deref().unwrap_or_default())
        .bind(record.input_type.as_deref().unwrap_or("object"))
        .bind(record.input_properties.as_deref().unwrap_or("{}"))
        .bind(record.input_required.as_deref().unwrap_or("[]"))
        .bind(record.url.as_deref().unwrap_or_default())
        .bind(record.headers.as_deref().unwrap_or("{}"))
        .bind(record.method.as_deref().unwrap_or("POST"))
        .bind(record.output_description.as_deref().unwrap_or_default())
        .execute(pool)
        .await
        .map_err(unavailable)?;
    Ok(())
}

fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::unavailable(err.to_string())
}

fn decode_row(row: &MySqlRow) -> Result<ToolRecord, StoreError> {
    let name: String = row
        .try_get("tool_name")
        .map_err(|e| StoreError::data("<unknown>", e.to_string()))?;

    let text = |column: &str| -> Result<Option<String>, StoreError> {
        row.try_get::<Option<String>, _>(column)
            .map_err(|e| StoreError::data(&name, format!("column {column}: {e}")))
    };

    Ok(ToolRecord {
        description: text("description")?,
        input_type: text("inputSchema_type")?,
        input_properties: text("inputSchema_properties")?,
        input_required: text("inputSchema_required")?,
        url: text("req_url")?,
        headers: text("req_header")?,
        method: text("req_method")?,
        output_description: text("outputSchema_description")?,
        name,
    })
}
