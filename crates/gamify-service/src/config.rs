//! Service configuration.

use std::str::FromStr;
use std::time::Duration;

use chrono::{FixedOffset, NaiveDate, Utc};

use gamify_engine::EngineConfig;

/// Which durable store to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local store. Data is lost on restart.
    Memory,
    /// Embedded `RocksDB` under `DATA_DIR`.
    Rocksdb,
    /// `PostgreSQL` at `DATABASE_URL`.
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rocksdb" | "rocks" => Ok(Self::Rocksdb),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Durable store backend (default: `rocksdb`).
    pub store_backend: StoreBackend,

    /// Path to `RocksDB` data directory (default: "/data/gamify").
    pub data_dir: String,

    /// `PostgreSQL` connection URL, required for the `postgres` backend.
    pub database_url: Option<String>,

    /// Redis URL. Unset means an in-process cache.
    pub redis_url: Option<String>,

    /// Upper bound for a single cache call.
    pub cache_timeout: Duration,

    /// Service API key for service-to-service auth.
    pub service_api_key: Option<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Claims accepted per user per minute. Zero disables the limit.
    pub claim_rate_limit_per_minute: u64,

    /// UTC offset, in minutes, of the calendar used for activity days.
    pub activity_utc_offset_minutes: i32,

    /// Engine tunables.
    pub engine: EngineConfig,
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let store_backend = match std::env::var("STORE_BACKEND") {
            Ok(raw) => raw.parse().unwrap_or_else(|e: String| {
                tracing::warn!(error = %e, "Falling back to default store backend");
                defaults.store_backend
            }),
            Err(_) => defaults.store_backend,
        };

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            store_backend,
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            database_url: std::env::var("DATABASE_URL").ok(),
            redis_url: std::env::var("REDIS_URL").ok().filter(|s| !s.is_empty()),
            cache_timeout: env_parse("CACHE_TIMEOUT_MS")
                .map_or(defaults.cache_timeout, Duration::from_millis),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
            claim_rate_limit_per_minute: env_parse("CLAIM_RATE_LIMIT_PER_MINUTE")
                .unwrap_or(defaults.claim_rate_limit_per_minute),
            activity_utc_offset_minutes: env_parse("ACTIVITY_UTC_OFFSET_MINUTES")
                .unwrap_or(defaults.activity_utc_offset_minutes),
            engine: defaults.engine,
        }
    }

    /// Today's calendar date in the configured activity timezone.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        let now = Utc::now();
        match FixedOffset::east_opt(self.activity_utc_offset_minutes.saturating_mul(60)) {
            Some(offset) => now.with_timezone(&offset).date_naive(),
            None => now.date_naive(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            store_backend: StoreBackend::Rocksdb,
            data_dir: "/data/gamify".into(),
            database_url: None,
            redis_url: None,
            cache_timeout: Duration::from_millis(50),
            service_api_key: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
            claim_rate_limit_per_minute: 60,
            activity_utc_offset_minutes: 0,
            engine: EngineConfig::default(),
        }
    }
}
