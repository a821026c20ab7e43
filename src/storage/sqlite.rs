use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use super::{EntryStore, StorageError, StorageResult};
use crate::models::{EntryId, Mood, WellnessEntry};

/// Embedded SQLite store; the journal and the outbox share one database file
/// and differ only by table.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    table: &'static str,
}

#[derive(Debug, FromRow)]
struct EntryRow {
    id: i64,
    mood: i64,
    energy: Option<i32>,
    sleep: Option<i32>,
    stress: Option<i32>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EntryRow> for WellnessEntry {
    type Error = StorageError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let mood = Mood::from_score(row.mood).ok_or_else(|| StorageError::CorruptRow {
            id: row.id,
            reason: format!("unknown mood score {}", row.mood),
        })?;
        Ok(WellnessEntry {
            id: row.id,
            mood,
            energy: row.energy,
            sleep: row.sleep,
            stress: row.stress,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

impl SqliteStore {
    pub fn journal(pool: SqlitePool) -> Self {
        Self {
            pool,
            table: "journal_entries",
        }
    }

    pub fn outbox(pool: SqlitePool) -> Self {
        Self {
            pool,
            table: "outbox_entries",
        }
    }
}

#[async_trait]
impl EntryStore for SqliteStore {
    async fn insert(&self, entry: &WellnessEntry) -> StorageResult<()> {
        let sql = format!(
            r#"
            INSERT INTO {} (id, mood, energy, sleep, stress, notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                mood = excluded.mood,
                energy = excluded.energy,
                sleep = excluded.sleep,
                stress = excluded.stress,
                notes = excluded.notes,
                created_at = excluded.created_at
            "#,
            self.table
        );

        sqlx::query(&sql)
            .bind(entry.id)
            .bind(i64::from(entry.mood.score()))
            .bind(entry.energy)
            .bind(entry.sleep)
            .bind(entry.stress)
            .bind(&entry.notes)
            .bind(entry.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_all(&self) -> StorageResult<Vec<WellnessEntry>> {
        let sql = format!(
            "SELECT id, mood, energy, sleep, stress, notes, created_at FROM {} ORDER BY id ASC",
            self.table
        );

        let rows = sqlx::query_as::<_, EntryRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(WellnessEntry::try_from).collect()
    }

    async fn remove(&self, id: EntryId) -> StorageResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", self.table);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> StorageResult<u64> {
        let sql = format!("DELETE FROM {}", self.table);
        let result = sqlx::query(&sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> StorageResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
