use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{EntryStore, StorageResult};
use crate::models::{EntryId, WellnessEntry};

/// In-process store. Contents live as long as the session that owns it.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<BTreeMap<EntryId, WellnessEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn insert(&self, entry: &WellnessEntry) -> StorageResult<()> {
        self.entries.lock().await.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn list_all(&self) -> StorageResult<Vec<WellnessEntry>> {
        Ok(self.entries.lock().await.values().cloned().collect())
    }

    async fn remove(&self, id: EntryId) -> StorageResult<bool> {
        Ok(self.entries.lock().await.remove(&id).is_some())
    }

    async fn clear(&self) -> StorageResult<u64> {
        let mut entries = self.entries.lock().await;
        let removed = entries.len() as u64;
        entries.clear();
        Ok(removed)
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
