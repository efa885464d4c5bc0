//! In-process tool store.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{StoreError, ToolRecord, ToolStore};

/// A [`ToolStore`] backed by an ordered map.
///
/// Handy for tests and for embedding the gateway without a database. The
/// `offline` switch makes every read fail as if the database were down.
#[derive(Debug, Default)]
pub struct MemoryToolStore {
    records: RwLock<BTreeMap<String, ToolRecord>>,
    offline: AtomicBool,
}

impl MemoryToolStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-filled with the given records.
    pub fn with_records(records: impl IntoIterator<Item = ToolRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|record| (record.name.clone(), record))
            .collect();
        Self {
            records: RwLock::new(map),
            offline: AtomicBool::new(false),
        }
    }

    /// Insert or replace the record keyed on its name.
    pub async fn upsert(&self, record: ToolRecord) {
        self.records
            .write()
            .await
            .insert(record.name.clone(), record);
    }

    pub async fn remove(&self, name: &str) -> Option<ToolRecord> {
        self.records.write().await.remove(name)
    }

    /// Simulate the store going away (or coming back).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("memory store is offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl ToolStore for MemoryToolStore {
    async fn list_records(&self) -> Result<Vec<ToolRecord>, StoreError> {
        self.check_online()?;
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn get_record(&self, name: &str) -> Result<Option<ToolRecord>, StoreError> {
        self.check_online()?;
        Ok(self.records.read().await.get(name).cloned())
    }
}
