use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::handlers;
use crate::AppState;

pub fn build_router(state: AppState, config: &Config) -> Router {
    let api_routes = Router::new()
        .route("/api/entries", post(handlers::entries::submit_entry))
        .route("/api/entries", get(handlers::entries::list_entries))
        .route("/api/entries", delete(handlers::entries::delete_entries))
        .route("/api/stats", get(handlers::stats::get_stats))
        .route("/api/export.csv", get(handlers::export::export_csv))
        .route("/api/sync", get(handlers::sync::sync_status))
        .route("/api/sync", post(handlers::sync::request_sync))
        .route("/api/sync/now", post(handlers::sync::sync_now));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route("/ws", get(handlers::ws::ws_handler))
        .route("/app/*path", get(handlers::assets::serve_asset));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(cors_layer(config))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = std::iter::once(&config.frontend_url)
        .chain(config.cors_extra_origins.iter())
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(hv) => Some(hv),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tokio::sync::broadcast;
    use tower::ServiceExt;

    use crate::context::tests::{context_with_sink, RecordingSink};
    use crate::sync::spawn_sync_worker;

    fn test_app(sink: RecordingSink) -> (Router, AppState) {
        let config = Config::for_tests();
        let ctx = Arc::new(context_with_sink(sink));
        let (ws_tx, _) = broadcast::channel(16);
        let (sync, _join) = spawn_sync_worker(ctx.clone(), ws_tx.clone(), 0);
        let state = AppState {
            ctx,
            sync,
            ws_tx,
            assets: None,
        };
        (build_router(state.clone(), &config), state)
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_app(RecordingSink::new());
        let resp = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["service"], "wellness-sync");
    }

    #[tokio::test]
    async fn test_submit_entry_returns_created() {
        let (app, state) = test_app(RecordingSink::new());
        let resp = app
            .oneshot(post_json(
                "/api/entries",
                r#"{"mood":"happy","energy":7,"sleep":6,"stress":3,"notes":"ok"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp).await;
        assert_eq!(json["delivered"], true);
        assert_eq!(json["entry"]["mood"], "happy");
        assert_eq!(state.ctx.pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_rating_is_422() {
        let (app, state) = test_app(RecordingSink::new());
        let resp = app
            .oneshot(post_json("/api/entries", r#"{"mood":"sad","stress":12}"#))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["message"], "Stress must be between 1 and 10");
        assert_eq!(state.ctx.pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_delivery_reports_advisory_and_status() {
        let (app, _) = test_app(RecordingSink::failing_first(1));
        let resp = app
            .clone()
            .oneshot(post_json("/api/entries", r#"{"mood":"neutral"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp).await;
        assert_eq!(json["delivered"], false);

        let resp = app.oneshot(get("/api/sync")).await.unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["pending"], 1);
    }

    #[tokio::test]
    async fn test_sync_now_drains_outbox_and_notifies() {
        let (app, state) = test_app(RecordingSink::failing_first(2));
        for mood in ["sad", "happy"] {
            let body = format!(r#"{{"mood":"{mood}"}}"#);
            app.clone().oneshot(post_json("/api/entries", &body)).await.unwrap();
        }
        let mut events = state.ws_tx.subscribe();

        let resp = app
            .clone()
            .oneshot(post_json("/api/sync/now", ""))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["delivered"], 2);
        assert_eq!(json["remaining"], 0);

        let event: Value = serde_json::from_str(&events.try_recv().unwrap()).unwrap();
        assert_eq!(event["type"], "entries_synced");
        assert_eq!(event["delivered"], 2);
    }

    #[tokio::test]
    async fn test_request_sync_is_accepted() {
        let (app, _) = test_app(RecordingSink::new());
        let resp = app.oneshot(post_json("/api/sync", "")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_stats_and_export() {
        let (app, _) = test_app(RecordingSink::new());
        for mood in ["very-happy", "sad"] {
            let body = format!(r#"{{"mood":"{mood}","notes":"a, b"}}"#);
            app.clone().oneshot(post_json("/api/entries", &body)).await.unwrap();
        }

        let resp = app.clone().oneshot(get("/api/stats")).await.unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["total_entries"], 2);
        assert_eq!(json["average_mood"], 3.5);
        assert_eq!(json["streak_days"], 1);
        assert_eq!(json["mood_trend"], "Stable");

        let resp = app.oneshot(get("/api/export.csv")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("attachment; filename=\"mood-data-"));
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let rows = crate::export::parse_csv(std::str::from_utf8(&bytes).unwrap()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.notes.as_deref() == Some("a, b")));
    }

    #[tokio::test]
    async fn test_delete_entries_clears_everything() {
        let (app, state) = test_app(RecordingSink::failing_first(1));
        app.clone()
            .oneshot(post_json("/api/entries", r#"{"mood":"sad"}"#))
            .await
            .unwrap();

        let req = Request::builder()
            .method("DELETE")
            .uri("/api/entries")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["journal_removed"], 1);
        assert_eq!(json["outbox_removed"], 1);

        let resp = app.oneshot(get("/api/entries")).await.unwrap();
        assert_eq!(body_json(resp).await, serde_json::json!([]));
        assert_eq!(state.ctx.pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_assets_disabled_without_origin() {
        let (app, _) = test_app(RecordingSink::new());
        let resp = app.oneshot(get("/app/index.html")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
