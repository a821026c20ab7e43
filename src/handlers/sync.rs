use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::error::AppResult;
use crate::models::WellnessEntry;
use crate::sync::{drain_and_notify, DrainReport, SyncTrigger};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SyncStatus {
    pub pending: usize,
    pub entries: Vec<WellnessEntry>,
}

#[derive(Debug, Serialize)]
pub struct SyncRequested {
    /// False when a drain was already pending.
    pub queued: bool,
}

pub async fn sync_status(State(state): State<AppState>) -> AppResult<Json<SyncStatus>> {
    let entries = state.ctx.pending_entries().await?;
    Ok(Json(SyncStatus {
        pending: entries.len(),
        entries,
    }))
}

/// Connectivity-restored signal from the client; the worker drains in the background.
pub async fn request_sync(State(state): State<AppState>) -> (StatusCode, Json<SyncRequested>) {
    let queued = state.sync.request(SyncTrigger::ConnectivityRestored);
    tracing::debug!(queued, "Sync requested by client");
    (StatusCode::ACCEPTED, Json(SyncRequested { queued }))
}

pub async fn sync_now(State(state): State<AppState>) -> AppResult<Json<DrainReport>> {
    let report = drain_and_notify(&state.ctx, &state.ws_tx, SyncTrigger::Manual).await?;
    Ok(Json(report))
}
