use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::AppResult;
use crate::stats::MoodTrend;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_entries: usize,
    /// Rounded to one decimal for display.
    pub average_mood: f64,
    pub streak_days: u32,
    pub mood_trend: MoodTrend,
    pub pending_sync: usize,
}

pub async fn get_stats(State(state): State<AppState>) -> AppResult<Json<StatsResponse>> {
    let stats = state.ctx.stats(state.ctx.today()).await?;
    let pending_sync = state.ctx.pending().await?;

    Ok(Json(StatsResponse {
        total_entries: stats.total_entries,
        average_mood: (stats.average_mood * 10.0).round() / 10.0,
        streak_days: stats.streak_days,
        mood_trend: stats.mood_trend,
        pending_sync,
    }))
}
