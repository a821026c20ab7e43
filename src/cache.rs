//! Cache-first asset cache for the front-end shell.
//!
//! Assets are grouped under named cache versions. `install` precaches a list of
//! paths into the current version, `activate` drops every other version, and
//! `fetch` answers from any cache before going to the network.
//!
//! Precached paths stay for the life of their version. Paths picked up at
//! runtime are capped per version and evicted oldest first.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use axum::body::Bytes;
use tokio::sync::RwLock;

/// Served when a navigation request misses the cache and the network is down.
pub const OFFLINE_FALLBACK: &str = "/index.html";

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{path} is not cached and the origin is unreachable")]
    Offline { path: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedAsset {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Debug, Default)]
struct VersionCache {
    assets: HashMap<String, CachedAsset>,
    /// Runtime-cached paths in insertion order. Precached paths are not listed.
    runtime: VecDeque<String>,
}

impl VersionCache {
    fn pin(&mut self, path: &str, asset: CachedAsset) {
        self.runtime.retain(|p| p != path);
        self.assets.insert(path.to_string(), asset);
    }

    /// Returns the paths evicted to stay within `max_runtime`.
    fn insert_runtime(&mut self, path: &str, asset: CachedAsset, max_runtime: usize) -> Vec<String> {
        let pinned = self.assets.contains_key(path) && !self.runtime.iter().any(|p| p == path);
        if !self.assets.contains_key(path) {
            self.runtime.push_back(path.to_string());
        }
        self.assets.insert(path.to_string(), asset);
        if pinned {
            return Vec::new();
        }

        let mut evicted = Vec::new();
        while self.runtime.len() > max_runtime {
            let Some(oldest) = self.runtime.pop_front() else {
                break;
            };
            self.assets.remove(&oldest);
            evicted.push(oldest);
        }
        evicted
    }
}

pub struct AssetCache {
    client: reqwest::Client,
    origin: String,
    current: String,
    max_runtime_entries: usize,
    caches: RwLock<HashMap<String, VersionCache>>,
}

impl AssetCache {
    pub fn new(
        origin: impl Into<String>,
        version: impl Into<String>,
        timeout: Duration,
        max_runtime_entries: usize,
    ) -> Result<Self, CacheError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            origin: origin.into(),
            current: version.into(),
            max_runtime_entries,
            caches: RwLock::new(HashMap::new()),
        })
    }

    pub fn version(&self) -> &str {
        &self.current
    }

    /// Precache `paths` into the current version. Returns how many were stored.
    pub async fn install(&self, paths: &[String]) -> usize {
        let mut stored = 0;
        for path in paths {
            match self.fetch_network(path).await {
                Ok(asset) if asset.status == 200 => {
                    self.pin(path, asset).await;
                    stored += 1;
                }
                Ok(asset) => {
                    tracing::warn!(path = %path, status = asset.status, "Precache skipped non-200 asset");
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Precache failed");
                }
            }
        }
        tracing::info!(version = %self.current, stored, requested = paths.len(), "Asset cache installed");
        stored
    }

    /// Drop every cache version other than the current one.
    pub async fn activate(&self) -> Vec<String> {
        let mut caches = self.caches.write().await;
        let stale: Vec<String> = caches
            .keys()
            .filter(|name| **name != self.current)
            .cloned()
            .collect();
        for name in &stale {
            caches.remove(name);
            tracing::info!(version = %name, "Deleted stale asset cache");
        }
        stale
    }

    /// Store `asset` in the current version for as long as the version lives.
    pub async fn pin(&self, path: &str, asset: CachedAsset) {
        self.caches
            .write()
            .await
            .entry(self.current.clone())
            .or_default()
            .pin(path, asset);
    }

    /// Store a runtime response, evicting the oldest runtime entries past the cap.
    pub async fn put(&self, path: &str, asset: CachedAsset) {
        let evicted = self
            .caches
            .write()
            .await
            .entry(self.current.clone())
            .or_default()
            .insert_runtime(path, asset, self.max_runtime_entries);
        if !evicted.is_empty() {
            tracing::debug!(evicted = evicted.len(), "Evicted runtime assets");
        }
    }

    /// Number of assets held in the current version.
    pub async fn entry_count(&self) -> usize {
        self.caches
            .read()
            .await
            .get(&self.current)
            .map_or(0, |c| c.assets.len())
    }

    /// Look the path up in the current version first, then in any other.
    pub async fn lookup(&self, path: &str) -> Option<CachedAsset> {
        let caches = self.caches.read().await;
        if let Some(hit) = caches.get(&self.current).and_then(|c| c.assets.get(path)) {
            return Some(hit.clone());
        }
        caches.values().find_map(|c| c.assets.get(path).cloned())
    }

    /// Cache first, then network. Successful network responses are cached.
    pub async fn fetch(&self, path: &str, navigation: bool) -> Result<CachedAsset, CacheError> {
        if let Some(hit) = self.lookup(path).await {
            tracing::debug!(path = %path, "Asset cache hit");
            return Ok(hit);
        }

        match self.fetch_network(path).await {
            Ok(asset) => {
                if asset.status == 200 {
                    self.put(path, asset.clone()).await;
                }
                Ok(asset)
            }
            Err(e) => {
                tracing::debug!(path = %path, error = %e, "Asset fetch failed");
                if navigation {
                    if let Some(fallback) = self.lookup(OFFLINE_FALLBACK).await {
                        return Ok(fallback);
                    }
                }
                Err(CacheError::Offline {
                    path: path.to_string(),
                })
            }
        }
    }

    async fn fetch_network(&self, path: &str) -> Result<CachedAsset, CacheError> {
        let url = format!("{}{}", self.origin, path);
        let response = self.client.get(&url).send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;
        Ok(CachedAsset {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNREACHABLE: &str = "http://127.0.0.1:9";

    fn cache() -> AssetCache {
        AssetCache::new(UNREACHABLE, "wellness-companion-v2", Duration::from_secs(1), 64).unwrap()
    }

    fn html(body: &'static str) -> CachedAsset {
        CachedAsset {
            status: 200,
            content_type: Some("text/html".into()),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[tokio::test]
    async fn test_cache_hit_needs_no_network() {
        let cache = cache();
        cache.put("/mood-tracker.html", html("<h1>mood</h1>")).await;

        let asset = cache.fetch("/mood-tracker.html", false).await.unwrap();
        assert_eq!(asset.body, Bytes::from_static(b"<h1>mood</h1>"));
    }

    #[tokio::test]
    async fn test_offline_navigation_falls_back_to_index() {
        let cache = cache();
        cache.pin(OFFLINE_FALLBACK, html("<h1>home</h1>")).await;

        let asset = cache.fetch("/dashboard.html", true).await.unwrap();
        assert_eq!(asset.body, Bytes::from_static(b"<h1>home</h1>"));
    }

    #[tokio::test]
    async fn test_offline_subresource_miss_is_an_error() {
        let cache = cache();
        cache.put(OFFLINE_FALLBACK, html("<h1>home</h1>")).await;

        let err = cache.fetch("/css/styles.css", false).await.unwrap_err();
        assert!(matches!(err, CacheError::Offline { .. }));
    }

    #[tokio::test]
    async fn test_activate_drops_stale_versions() {
        let cache = cache();
        cache.put("/", html("new")).await;
        cache
            .caches
            .write()
            .await
            .entry("wellness-companion-v1".into())
            .or_default()
            .pin("/old.html", html("old"));

        assert!(cache.lookup("/old.html").await.is_some());
        let removed = cache.activate().await;
        assert_eq!(removed, vec!["wellness-companion-v1".to_string()]);
        assert!(cache.lookup("/old.html").await.is_none());
        assert!(cache.lookup("/").await.is_some());
    }

    #[tokio::test]
    async fn test_install_against_unreachable_origin_stores_nothing() {
        let cache = cache();
        let stored = cache.install(&["/".to_string(), "/index.html".to_string()]).await;
        assert_eq!(stored, 0);
        assert_eq!(cache.version(), "wellness-companion-v2");
    }

    #[tokio::test]
    async fn test_runtime_entries_are_capped_oldest_first() {
        let cache = AssetCache::new(UNREACHABLE, "v", Duration::from_secs(1), 3).unwrap();
        cache.pin(OFFLINE_FALLBACK, html("<h1>home</h1>")).await;

        for i in 0..10 {
            cache.put(&format!("/page-{i}.html"), html("page")).await;
        }

        assert_eq!(cache.entry_count().await, 4);
        assert!(cache.lookup("/page-6.html").await.is_none());
        assert!(cache.lookup("/page-9.html").await.is_some());
        assert!(cache.lookup(OFFLINE_FALLBACK).await.is_some());
    }

    #[tokio::test]
    async fn test_refreshing_a_pinned_path_keeps_it_pinned() {
        let cache = AssetCache::new(UNREACHABLE, "v", Duration::from_secs(1), 1).unwrap();
        cache.pin("/", html("shell")).await;
        cache.put("/", html("shell v2")).await;
        cache.put("/a.html", html("a")).await;
        cache.put("/b.html", html("b")).await;

        assert_eq!(cache.lookup("/").await.unwrap().body, Bytes::from_static(b"shell v2"));
        assert!(cache.lookup("/a.html").await.is_none());
        assert_eq!(cache.entry_count().await, 2);
    }

    #[tokio::test]
    async fn test_origin_answering_every_path_cannot_grow_cache_past_cap() {
        use axum::Router;

        let origin = Router::new().fallback(|| async { "<h1>any</h1>" });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, origin).await.unwrap();
        });

        let cache = AssetCache::new(format!("http://{addr}"), "v", Duration::from_secs(5), 16).unwrap();
        for i in 0..200 {
            let asset = cache.fetch(&format!("/anything-{i}"), false).await.unwrap();
            assert_eq!(asset.status, 200);
        }

        assert_eq!(cache.entry_count().await, 16);
        assert!(cache.lookup("/anything-199").await.is_some());
        assert!(cache.lookup("/anything-0").await.is_none());
    }
}
