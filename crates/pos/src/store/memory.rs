//! In-memory `LocalStore` implementation.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Collection, LocalStore, Result, StoreError, StoredRecord};

/// Store that keeps collections in process memory.
///
/// Contents are lost on restart. Availability can be toggled to exercise the
/// `StorageUnavailable` paths of callers.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<StoredRecord>>>,
    unavailable: RwLock<bool>,
    failing: RwLock<HashSet<Collection>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with `StoreError::Unavailable`.
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    /// Fail operations on one collection only.
    pub async fn set_collection_unavailable(&self, collection: Collection, unavailable: bool) {
        let mut failing = self.failing.write().await;
        if unavailable {
            failing.insert(collection);
        } else {
            failing.remove(&collection);
        }
    }

    async fn check_available(&self, collection: Collection) -> Result<()> {
        if *self.unavailable.read().await {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        if self.failing.read().await.contains(&collection) {
            return Err(StoreError::Unavailable(format!("{collection} switched off")));
        }
        Ok(())
    }
}

/// Collapse repeated ids so the last occurrence wins, at its own position.
fn dedupe_last_wins(records: Vec<StoredRecord>) -> Vec<StoredRecord> {
    let mut out: Vec<StoredRecord> = Vec::with_capacity(records.len());
    for record in records {
        out.retain(|existing| existing.id != record.id);
        out.push(record);
    }
    out
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredRecord>> {
        self.check_available(collection).await?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|records| records.iter().find(|r| r.id == id))
            .cloned())
    }

    async fn get_all(&self, collection: Collection) -> Result<Vec<StoredRecord>> {
        self.check_available(collection).await?;
        let collections = self.collections.read().await;
        Ok(collections.get(&collection).cloned().unwrap_or_default())
    }

    async fn save_items(&self, collection: Collection, records: Vec<StoredRecord>) -> Result<()> {
        self.check_available(collection).await?;
        let mut collections = self.collections.write().await;
        collections.insert(collection, dedupe_last_wins(records));
        Ok(())
    }

    async fn put_items(&self, collection: Collection, records: Vec<StoredRecord>) -> Result<()> {
        self.check_available(collection).await?;
        let mut collections = self.collections.write().await;
        let existing = collections.entry(collection).or_default();
        for record in records {
            if let Some(slot) = existing.iter_mut().find(|r| r.id == record.id) {
                slot.body = record.body;
            } else {
                existing.push(record);
            }
        }
        Ok(())
    }

    async fn delete_item(&self, collection: Collection, id: &str) -> Result<()> {
        self.check_available(collection).await?;
        let mut collections = self.collections.write().await;
        if let Some(records) = collections.get_mut(&collection) {
            records.retain(|r| r.id != id);
        }
        Ok(())
    }

    async fn clear_store(&self, collection: Collection) -> Result<()> {
        self.check_available(collection).await?;
        self.collections.write().await.remove(&collection);
        Ok(())
    }
}
