use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context};
use chrono::FixedOffset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    File,
    Sqlite,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "sqlite" => Ok(Self::Sqlite),
            other => bail!("unknown storage backend '{other}' (expected memory, file or sqlite)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkFormat {
    Json,
    Form,
}

impl FromStr for SinkFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "form" => Ok(Self::Form),
            other => bail!("unknown sink format '{other}' (expected json or form)"),
        }
    }
}

/// Form field names used when the sink expects a form-encoded body.
#[derive(Debug, Clone)]
pub struct SinkFields {
    pub mood: String,
    pub energy: String,
    pub sleep: String,
    pub stress: String,
    pub notes: String,
    pub timestamp: String,
}

impl Default for SinkFields {
    fn default() -> Self {
        Self {
            mood: "mood".into(),
            energy: "energy".into(),
            sleep: "sleep".into(),
            stress: "stress".into(),
            notes: "notes".into(),
            timestamp: "timestamp".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    pub cors_extra_origins: Vec<String>,

    pub storage_backend: StorageBackend,
    pub data_dir: PathBuf,
    pub database_url: String,

    pub sink_url: Option<String>,
    pub sink_format: SinkFormat,
    pub sink_timeout_secs: u64,
    pub sink_fields: SinkFields,
    /// Zero disables the periodic drain.
    pub sync_interval_secs: u64,

    pub utc_offset: FixedOffset,

    pub asset_origin: Option<String>,
    pub cache_version: String,
    pub precache_paths: Vec<String>,
    /// Cap on assets cached at runtime per version; precached paths are not counted.
    pub cache_max_entries: usize,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

fn parse_var<T>(key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = var_or(key, default);
    raw.parse::<T>()
        .map_err(|e| anyhow::anyhow!("{key} is invalid ('{raw}'): {e}"))
}

fn list_var(key: &str, default: &str) -> Vec<String> {
    var_or(key, default)
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let data_dir = PathBuf::from(var_or("DATA_DIR", "./data"));
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{}", data_dir.join("wellness.db").display()));

        let offset_minutes: i32 = parse_var("WELLNESS_UTC_OFFSET_MINUTES", "0")?;
        let utc_offset = FixedOffset::east_opt(offset_minutes * 60)
            .with_context(|| format!("WELLNESS_UTC_OFFSET_MINUTES out of range: {offset_minutes}"))?;

        let defaults = SinkFields::default();
        let sink_fields = SinkFields {
            mood: var_or("SINK_FIELD_MOOD", &defaults.mood),
            energy: var_or("SINK_FIELD_ENERGY", &defaults.energy),
            sleep: var_or("SINK_FIELD_SLEEP", &defaults.sleep),
            stress: var_or("SINK_FIELD_STRESS", &defaults.stress),
            notes: var_or("SINK_FIELD_NOTES", &defaults.notes),
            timestamp: var_or("SINK_FIELD_TIMESTAMP", &defaults.timestamp),
        };

        Ok(Self {
            host: var_or("HOST", "0.0.0.0"),
            port: parse_var("PORT", "8080")?,
            frontend_url: var_or("FRONTEND_URL", "http://localhost:3000"),
            cors_extra_origins: list_var("CORS_EXTRA_ORIGINS", ""),

            storage_backend: parse_var("STORAGE_BACKEND", "sqlite")?,
            data_dir,
            database_url,

            sink_url: env::var("SINK_URL").ok().filter(|s| !s.is_empty()),
            sink_format: parse_var("SINK_FORMAT", "json")?,
            sink_timeout_secs: parse_var("SINK_TIMEOUT_SECS", "10")?,
            sink_fields,
            sync_interval_secs: parse_var("SYNC_INTERVAL_SECS", "0")?,

            utc_offset,

            asset_origin: env::var("ASSET_ORIGIN")
                .ok()
                .map(|s| s.trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty()),
            cache_version: var_or("CACHE_VERSION", "wellness-companion-v1"),
            precache_paths: list_var("PRECACHE_PATHS", "/,/index.html"),
            cache_max_entries: parse_var("CACHE_MAX_ENTRIES", "256")?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Directory holding the SQLite database file, if `database_url` names one.
    pub fn sqlite_path(&self) -> Option<&Path> {
        let path = self
            .database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))?;
        if path.contains(":memory:") {
            return None;
        }
        Path::new(path).parent().filter(|p| !p.as_os_str().is_empty())
    }
}

#[cfg(test)]
impl Config {
    /// In-memory configuration with no sink and no asset origin.
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            frontend_url: "http://localhost:3000".into(),
            cors_extra_origins: Vec::new(),
            storage_backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data"),
            database_url: "sqlite::memory:".into(),
            sink_url: None,
            sink_format: SinkFormat::Json,
            sink_timeout_secs: 1,
            sink_fields: SinkFields::default(),
            sync_interval_secs: 0,
            utc_offset: FixedOffset::east_opt(0).unwrap(),
            asset_origin: None,
            cache_version: "wellness-companion-test".into(),
            precache_paths: Vec::new(),
            cache_max_entries: 16,
        }
    }
}
