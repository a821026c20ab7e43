//! Offline-first sync service for daily wellness check-ins.
//!
//! Check-ins are journaled locally, queued in an outbox, and delivered to a
//! remote sink at-least-once by a background drain. Rolling mood statistics and
//! a CSV export are computed from the journal.

use std::sync::Arc;

use tokio::sync::broadcast;

pub mod cache;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod export;
pub mod handlers;
pub mod models;
pub mod queue;
pub mod routes;
pub mod stats;
pub mod storage;
pub mod sync;

use cache::AssetCache;
use context::WellnessContext;
use sync::SyncHandle;

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<WellnessContext>,
    pub sync: SyncHandle,
    pub ws_tx: broadcast::Sender<String>,
    pub assets: Option<Arc<AssetCache>>,
}
