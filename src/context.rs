//! Per-session state. One `WellnessContext` is built at startup and handed to
//! every operation; nothing lives in globals.

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use validator::Validate;

use crate::error::AppResult;
use crate::export;
use crate::models::{CreateEntryRequest, EntryIdGenerator, EntryQuery, WellnessEntry};
use crate::queue::EntryQueue;
use crate::stats::{compute_stats, MoodStats};
use crate::storage::{EntryStore, Stores};
use crate::sync::{DrainReport, RemoteSink};

pub struct WellnessContext {
    journal: Arc<dyn EntryStore>,
    outbox: EntryQueue,
    sink: Box<dyn RemoteSink>,
    ids: EntryIdGenerator,
    /// Held for drains and bulk deletes so their read-then-remove sequences
    /// never interleave.
    drain_lock: Mutex<()>,
    utc_offset: FixedOffset,
}

#[derive(Debug, Serialize)]
pub struct SubmitOutcome {
    pub entry: WellnessEntry,
    pub delivered: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DeletionReport {
    pub journal_removed: u64,
    pub outbox_removed: u64,
}

impl WellnessContext {
    /// Build the context and seed the id generator past every stored id.
    pub async fn open(
        stores: Stores,
        sink: Box<dyn RemoteSink>,
        utc_offset: FixedOffset,
    ) -> AppResult<Self> {
        let ctx = Self {
            journal: stores.journal,
            outbox: EntryQueue::new(stores.outbox),
            sink,
            ids: EntryIdGenerator::new(),
            drain_lock: Mutex::new(()),
            utc_offset,
        };

        let journal = ctx.journal.list_all().await?;
        let outbox = ctx.outbox.list_all().await?;
        for entry in journal.iter().chain(outbox.iter()) {
            ctx.ids.observe(entry.id);
        }

        tracing::info!(
            journal = journal.len(),
            pending = outbox.len(),
            "Wellness context opened"
        );
        Ok(ctx)
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.utc_offset).date_naive()
    }

    /// Record a check-in locally, then try to deliver it right away. A failed
    /// delivery leaves the entry queued for the next drain.
    pub async fn submit(&self, req: CreateEntryRequest) -> AppResult<SubmitOutcome> {
        let now = Utc::now();
        let entry = WellnessEntry::from_request(self.ids.next(now), now, req);
        entry.validate()?;

        self.outbox.enqueue(&entry).await?;
        if let Err(e) = self.journal.insert(&entry).await {
            if let Err(undo) = self.outbox.remove(entry.id).await {
                tracing::error!(entry_id = entry.id, error = %undo, "Failed to unqueue entry after journal error");
            }
            return Err(e.into());
        }

        let delivered = match self.sink.deliver(&entry).await {
            Ok(()) => {
                if let Err(e) = self.outbox.remove(entry.id).await {
                    // Still queued, so the next drain sends it again.
                    tracing::warn!(entry_id = entry.id, error = %e, "Delivered entry could not be unqueued");
                }
                true
            }
            Err(e) => {
                tracing::warn!(entry_id = entry.id, error = %e, "Immediate delivery failed, entry stays queued");
                false
            }
        };

        let message = if delivered {
            "Mood entry saved successfully!".to_string()
        } else {
            "Mood saved locally. Will sync when online.".to_string()
        };

        Ok(SubmitOutcome {
            entry,
            delivered,
            message,
        })
    }

    /// Attempt delivery of every queued entry. Each entry is unqueued right after
    /// its own delivery succeeds; failures stay queued and do not stop the batch.
    pub async fn drain(&self) -> AppResult<DrainReport> {
        let _guard = self.drain_lock.lock().await;

        let pending = self.outbox.list_all().await?;
        let mut report = DrainReport {
            attempted: pending.len(),
            ..DrainReport::default()
        };

        for entry in &pending {
            match self.sink.deliver(entry).await {
                Ok(()) => {
                    self.outbox.remove(entry.id).await?;
                    report.delivered += 1;
                }
                Err(e) => {
                    tracing::warn!(entry_id = entry.id, error = %e, "Delivery failed, entry stays queued");
                    report.failed += 1;
                }
            }
        }

        report.remaining = self.outbox.len().await?;
        Ok(report)
    }

    /// Journal entries whose local date falls in the optional range.
    pub async fn entries(&self, query: &EntryQuery) -> AppResult<Vec<WellnessEntry>> {
        let mut entries = self.journal.list_all().await?;
        entries.retain(|e| {
            let day = e.local_date(self.utc_offset);
            query.start_date.map_or(true, |start| day >= start)
                && query.end_date.map_or(true, |end| day <= end)
        });
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    pub async fn stats(&self, today: NaiveDate) -> AppResult<MoodStats> {
        let entries = self.journal.list_all().await?;
        Ok(compute_stats(&entries, today, self.utc_offset))
    }

    pub async fn pending(&self) -> AppResult<usize> {
        self.outbox.len().await
    }

    pub async fn pending_entries(&self) -> AppResult<Vec<WellnessEntry>> {
        self.outbox.list_all().await
    }

    pub async fn export_csv(&self) -> AppResult<String> {
        let entries = self.journal.list_all().await?;
        Ok(export::to_csv(&entries, self.utc_offset))
    }

    /// User-initiated deletion of all local data, queued entries included.
    pub async fn delete_all(&self) -> AppResult<DeletionReport> {
        let _guard = self.drain_lock.lock().await;
        let outbox_removed = self.outbox.clear().await?;
        let journal_removed = self.journal.clear().await?;
        tracing::info!(journal_removed, outbox_removed, "Local wellness data deleted");
        Ok(DeletionReport {
            journal_removed,
            outbox_removed,
        })
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.journal.ping().await?;
        self.outbox.store().ping().await?;
        Ok(())
    }
}
