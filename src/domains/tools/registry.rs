//! Tool Registry - resolves tool definitions from the backing store.
//!
//! Every call reads the store afresh; nothing is cached, so an upsert or a
//! delete made by an administrator is visible on the very next request.

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::definition::ToolDefinition;
use super::error::ToolError;
use super::store::ToolStore;

/// Read-only view over stored tool definitions.
#[derive(Clone)]
pub struct ToolRegistry {
    store: Arc<dyn ToolStore>,
}

impl ToolRegistry {
    /// Create a registry over the given store.
    pub fn new(store: Arc<dyn ToolStore>) -> Self {
        Self { store }
    }

    /// All definitions, sorted by name ascending.
    ///
    /// An empty store yields an empty list. A single undecodable row fails
    /// the whole call with [`ToolError::DataError`].
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<ToolDefinition>, ToolError> {
        let records = self.store.list_records().await?;
        let mut tools = records
            .into_iter()
            .map(ToolDefinition::from_record)
            .collect::<Result<Vec<_>, _>>()?;
        tools.sort_by(|a, b| a.name.cmp(&b.name));

        debug!("Registry listed {} tools", tools.len());
        Ok(tools)
    }

    /// The definition named exactly `name`, or `None`. Name matching is
    /// case-sensitive whatever the store's own collation does.
    #[instrument(skip(self))]
    pub async fn get(&self, name: &str) -> Result<Option<ToolDefinition>, ToolError> {
        match self.store.get_record(name).await? {
            Some(record) if record.name == name => ToolDefinition::from_record(record).map(Some),
            Some(record) => {
                warn!("Store returned '{}' for lookup of '{}', ignoring", record.name, name);
                Ok(None)
            }
            None => {
                debug!("Tool '{}' not in store", name);
                Ok(None)
            }
        }
    }
}
