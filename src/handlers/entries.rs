use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::context::{DeletionReport, SubmitOutcome};
use crate::error::AppResult;
use crate::models::{CreateEntryRequest, EntryQuery, WellnessEntry};
use crate::AppState;

pub async fn submit_entry(
    State(state): State<AppState>,
    Json(body): Json<CreateEntryRequest>,
) -> AppResult<(StatusCode, Json<SubmitOutcome>)> {
    let outcome = state.ctx.submit(body).await?;

    let msg = serde_json::json!({
        "type": "entry_created",
        "entry_id": outcome.entry.id,
        "delivered": outcome.delivered,
    });
    let _ = state.ws_tx.send(msg.to_string());

    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<EntryQuery>,
) -> AppResult<Json<Vec<WellnessEntry>>> {
    let entries = state.ctx.entries(&query).await?;
    Ok(Json(entries))
}

pub async fn delete_entries(State(state): State<AppState>) -> AppResult<Json<DeletionReport>> {
    let report = state.ctx.delete_all().await?;
    Ok(Json(report))
}
