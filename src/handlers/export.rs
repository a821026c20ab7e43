use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};

use crate::error::AppResult;
use crate::AppState;

pub async fn export_csv(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let csv = state.ctx.export_csv().await?;
    let disposition = format!(
        "attachment; filename=\"mood-data-{}.csv\"",
        state.ctx.today().format("%Y-%m-%d")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}
