use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::cache::CacheError;
use crate::error::{AppError, AppResult};
use crate::AppState;

fn is_navigation(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("text/html"))
        .unwrap_or(false)
}

pub async fn serve_asset(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let cache = state
        .assets
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Asset cache disabled".into()))?;

    let path = format!("/{}", path.trim_start_matches('/'));
    let asset = cache
        .fetch(&path, is_navigation(&headers))
        .await
        .map_err(|e| match e {
            CacheError::Offline { path } => AppError::NotFound(format!("{path} unavailable offline")),
            other => AppError::Internal(other.into()),
        })?;

    let status = StatusCode::from_u16(asset.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = asset
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Ok((status, [(header::CONTENT_TYPE, content_type)], asset.body))
}
