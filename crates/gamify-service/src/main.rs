//! Gamify Service - HTTP API for points, streaks, levels and badges.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gamify_cache::{Cache, CachePolicy, MemoryCache, RedisCache};
use gamify_service::{create_router, AppState, ServiceConfig, StoreBackend};
use gamify_store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gamify=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Gamify Service");

    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        store_backend = ?config.store_backend,
        redis_configured = %config.redis_url.is_some(),
        utc_offset_minutes = config.activity_utc_offset_minutes,
        "Service configuration loaded"
    );

    let store = open_store(&config).await?;
    let cache = open_cache(&config).await;

    let state = AppState::new(store, cache, config.clone());
    let app = create_router(state);

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store - ledgers are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Rocksdb => open_rocks(&config.data_dir),
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL is required for the postgres backend")?;
            tracing::info!("Connecting to PostgreSQL store");
            Ok(Arc::new(PgStore::connect(url).await?))
        }
    }
}

#[cfg(feature = "rocksdb-backend")]
fn open_rocks(data_dir: &str) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    tracing::info!(path = %data_dir, "Opening RocksDB store");
    Ok(Arc::new(gamify_store::RocksStore::open(data_dir)?))
}

#[cfg(not(feature = "rocksdb-backend"))]
fn open_rocks(_data_dir: &str) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    Err("built without the rocksdb-backend feature".into())
}

/// Redis when configured and reachable, otherwise a process-local cache.
async fn open_cache(config: &ServiceConfig) -> Arc<dyn Cache> {
    let Some(url) = config.redis_url.as_deref() else {
        tracing::info!("REDIS_URL not set, using in-process cache");
        return Arc::new(MemoryCache::new());
    };

    let policy = CachePolicy {
        timeout: config.cache_timeout,
        key_prefix: None,
    };
    match RedisCache::connect(url, policy).await {
        Ok(cache) => {
            tracing::info!("Connected to Redis cache");
            Arc::new(cache)
        }
        Err(e) => {
            tracing::error!(error = %e, "Redis unavailable, falling back to in-process cache");
            Arc::new(MemoryCache::new())
        }
    }
}
