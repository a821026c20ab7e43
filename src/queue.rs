use std::sync::Arc;

use validator::Validate;

use crate::error::AppResult;
use crate::models::{EntryId, WellnessEntry};
use crate::storage::EntryStore;

/// Entries waiting for confirmed delivery to the remote sink.
///
/// Enqueueing an id that is already queued overwrites it. Entries are immutable
/// once created, so in practice that is a no-op.
#[derive(Clone)]
pub struct EntryQueue {
    store: Arc<dyn EntryStore>,
}

impl EntryQueue {
    pub fn new(store: Arc<dyn EntryStore>) -> Self {
        Self { store }
    }

    /// Rejects entries with out-of-range fields before anything is written.
    pub async fn enqueue(&self, entry: &WellnessEntry) -> AppResult<()> {
        entry.validate()?;
        self.store.insert(entry).await?;
        tracing::debug!(entry_id = entry.id, "Entry queued for delivery");
        Ok(())
    }

    /// A fresh snapshot each call, ordered by id.
    pub async fn list_all(&self) -> AppResult<Vec<WellnessEntry>> {
        Ok(self.store.list_all().await?)
    }

    pub async fn remove(&self, id: EntryId) -> AppResult<bool> {
        Ok(self.store.remove(id).await?)
    }

    pub async fn clear(&self) -> AppResult<u64> {
        Ok(self.store.clear().await?)
    }

    pub async fn len(&self) -> AppResult<usize> {
        Ok(self.store.list_all().await?.len())
    }

    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::entry::fixtures;
    use crate::models::Mood;
    use crate::storage::MemoryStore;
    use chrono::Utc;

    fn queue() -> EntryQueue {
        EntryQueue::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_enqueue_then_list_contains_entry_once() {
        let queue = queue();
        let entry = fixtures::entry(10, Mood::Happy, Utc::now());

        queue.enqueue(&entry).await.unwrap();
        queue.enqueue(&entry).await.unwrap();

        let listed = queue.list_all().await.unwrap();
        assert_eq!(listed.iter().filter(|e| **e == entry).count(), 1);
        assert_eq!(queue.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_entry_is_never_stored() {
        let queue = queue();
        let mut entry = fixtures::entry(1, Mood::Sad, Utc::now());
        entry.stress = Some(42);

        let err = queue.enqueue(&entry).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(queue.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_all_is_restartable() {
        let queue = queue();
        let now = Utc::now();
        queue.enqueue(&fixtures::entry(1, Mood::Sad, now)).await.unwrap();
        queue.enqueue(&fixtures::entry(2, Mood::Happy, now)).await.unwrap();

        let first = queue.list_all().await.unwrap();
        let second = queue.list_all().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_empties_queue() {
        let queue = queue();
        queue.enqueue(&fixtures::entry(1, Mood::Sad, Utc::now())).await.unwrap();
        assert_eq!(queue.clear().await.unwrap(), 1);
        assert_eq!(queue.len().await.unwrap(), 0);
    }
}
