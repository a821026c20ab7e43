//! Key-indexed durable storage for wellness entries.
//!
//! The journal (every entry ever submitted) and the outbox (entries still waiting
//! for remote delivery) are both [`EntryStore`]s. Callers never know which backend
//! they are talking to, so the queue, the sync job and the aggregator stay
//! storage-agnostic.

mod file;
mod memory;
mod sqlite;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, StorageBackend};
use crate::models::{EntryId, WellnessEntry};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt store {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Corrupt row {id}: {reason}")]
    CorruptRow { id: EntryId, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Each call is a complete operation on the store: no caller ever observes a
/// half-applied insert, remove or clear.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Insert or overwrite the entry with the same id.
    async fn insert(&self, entry: &WellnessEntry) -> StorageResult<()>;

    /// Fresh snapshot of every entry, ordered by id.
    async fn list_all(&self) -> StorageResult<Vec<WellnessEntry>>;

    /// Returns whether an entry was removed.
    async fn remove(&self, id: EntryId) -> StorageResult<bool>;

    /// Returns how many entries were removed.
    async fn clear(&self) -> StorageResult<u64>;

    async fn ping(&self) -> StorageResult<()>;

    fn backend(&self) -> &'static str;
}

/// Journal and outbox for the configured backend.
pub struct Stores {
    pub journal: Arc<dyn EntryStore>,
    pub outbox: Arc<dyn EntryStore>,
}

pub async fn open_stores(config: &Config) -> StorageResult<Stores> {
    let stores = match config.storage_backend {
        StorageBackend::Memory => Stores {
            journal: Arc::new(MemoryStore::new()),
            outbox: Arc::new(MemoryStore::new()),
        },
        StorageBackend::File => {
            tokio::fs::create_dir_all(&config.data_dir).await?;
            Stores {
                journal: Arc::new(FileStore::open(config.data_dir.join("journal.json")).await?),
                outbox: Arc::new(FileStore::open(config.data_dir.join("outbox.json")).await?),
            }
        }
        StorageBackend::Sqlite => {
            if let Some(parent) = config.sqlite_path() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let pool = crate::db::create_pool(&config.database_url).await?;
            crate::db::run_migrations(&pool).await?;
            Stores {
                journal: Arc::new(SqliteStore::journal(pool.clone())),
                outbox: Arc::new(SqliteStore::outbox(pool)),
            }
        }
    };

    tracing::info!(
        backend = stores.journal.backend(),
        "Entry stores opened"
    );
    Ok(stores)
}
