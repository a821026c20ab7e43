//! JSON-file backed store.
//!
//! The whole store is one JSON array. Every mutation rewrites the array to a
//! sibling temp file and renames it over the live file while holding the store
//! lock, so a crash mid-write leaves the previous version intact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{EntryStore, StorageError, StorageResult};
use crate::models::{EntryId, WellnessEntry};

pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<EntryId, WellnessEntry>>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist yet.
    pub async fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let list: Vec<WellnessEntry> =
                    serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
                        path: path.display().to_string(),
                        source,
                    })?;
                list.into_iter().map(|e| (e.id, e)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "File store opened");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    async fn persist(&self, entries: &BTreeMap<EntryId, WellnessEntry>) -> StorageResult<()> {
        let list: Vec<&WellnessEntry> = entries.values().collect();
        let bytes = serde_json::to_vec_pretty(&list).map_err(|source| StorageError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl EntryStore for FileStore {
    async fn insert(&self, entry: &WellnessEntry) -> StorageResult<()> {
        let mut entries = self.entries.lock().await;
        let previous = entries.insert(entry.id, entry.clone());
        if let Err(e) = self.persist(&entries).await {
            // Keep memory in step with disk.
            match previous {
                Some(prev) => entries.insert(entry.id, prev),
                None => entries.remove(&entry.id),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn list_all(&self) -> StorageResult<Vec<WellnessEntry>> {
        Ok(self.entries.lock().await.values().cloned().collect())
    }

    async fn remove(&self, id: EntryId) -> StorageResult<bool> {
        let mut entries = self.entries.lock().await;
        let Some(removed) = entries.remove(&id) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&entries).await {
            entries.insert(id, removed);
            return Err(e);
        }
        Ok(true)
    }

    async fn clear(&self) -> StorageResult<u64> {
        let mut entries = self.entries.lock().await;
        let removed = entries.len() as u64;
        self.persist(&BTreeMap::new()).await?;
        entries.clear();
        Ok(removed)
    }

    async fn ping(&self) -> StorageResult<()> {
        match tokio::fs::metadata(&self.path).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let parent = self
                    .path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                tokio::fs::metadata(parent).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}
