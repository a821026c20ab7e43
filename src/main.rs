use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::broadcast;

use wellness_sync::cache::AssetCache;
use wellness_sync::config::Config;
use wellness_sync::context::WellnessContext;
use wellness_sync::sync::{self, SyncTrigger};
use wellness_sync::{routes, storage, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wellness_sync=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env()?);

    let stores = storage::open_stores(&config)
        .await
        .context("failed to open entry stores")?;
    let sink = sync::sink_from_config(&config).context("failed to build remote sink")?;
    let ctx = Arc::new(WellnessContext::open(stores, sink, config.utc_offset).await?);

    let (ws_tx, _) = broadcast::channel::<String>(256);

    let (sync, _worker) = sync::spawn_sync_worker(ctx.clone(), ws_tx.clone(), config.sync_interval_secs);
    // Anything left from the previous run gets a delivery attempt at boot.
    sync.request(SyncTrigger::ConnectivityRestored);

    let assets = match &config.asset_origin {
        Some(origin) => {
            let cache = Arc::new(AssetCache::new(
                origin.clone(),
                config.cache_version.clone(),
                Duration::from_secs(config.sink_timeout_secs),
                config.cache_max_entries,
            )?);
            spawn_asset_install(cache.clone(), config.precache_paths.clone());
            Some(cache)
        }
        None => None,
    };

    let state = AppState {
        ctx,
        sync,
        ws_tx,
        assets,
    };

    let app = routes::build_router(state, &config);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn spawn_asset_install(cache: Arc<AssetCache>, paths: Vec<String>) {
    tokio::spawn(async move {
        cache.install(&paths).await;
        cache.activate().await;
    });
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Unable to listen for shutdown signal: {}", err);
    }
    tracing::info!("Shutdown signal received");
}
