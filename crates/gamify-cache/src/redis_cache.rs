//! Redis cache backend.
//!
//! Every command is wrapped in `tokio::time::timeout` so a slow or partitioned
//! Redis costs a caller at most [`CachePolicy::timeout`] before it falls back
//! to the durable path.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::time::timeout;

use crate::error::{CacheError, Result};
use crate::Cache;

/// Tunables for the Redis backend.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// Upper bound for a single cache command.
    pub timeout: Duration,
    /// Prefix prepended to every key, without the trailing separator.
    pub key_prefix: Option<String>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(50),
            key_prefix: None,
        }
    }
}

/// Redis-backed cache.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    policy: CachePolicy,
}

impl RedisCache {
    /// Connect to Redis.
    ///
    /// The initial connection is bounded by `policy.timeout` times ten, so a
    /// missing Redis fails startup quickly instead of hanging.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or Redis cannot be reached.
    pub async fn connect(url: &str, policy: CachePolicy) -> Result<Self> {
        let client =
            redis::Client::open(url).map_err(|e| CacheError::Unavailable(e.to_string()))?;

        let conn = timeout(policy.timeout * 10, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Timeout)??;

        tracing::info!(timeout_ms = policy.timeout.as_millis(), "Connected to Redis");
        Ok(Self { conn, policy })
    }

    /// Wrap an existing connection manager.
    #[must_use]
    pub fn from_connection(conn: ConnectionManager, policy: CachePolicy) -> Self {
        Self { conn, policy }
    }

    fn key(&self, key: &str) -> String {
        match &self.policy.key_prefix {
            Some(prefix) => format!("{prefix}:{key}"),
            None => key.to_string(),
        }
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match timeout(self.policy.timeout, op).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::Timeout),
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        self.bounded(async move {
            let value: Option<Vec<u8>> = conn.get(key).await?;
            Ok::<_, redis::RedisError>(value)
        })
        .await
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let key = self.key(key);
        let seconds = ttl.as_secs().max(1);
        let mut conn = self.conn.clone();
        self.bounded(async move {
            let () = conn.set_ex(key, value, seconds).await?;
            Ok::<_, redis::RedisError>(())
        })
        .await
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let keys: Vec<String> = keys.iter().map(|k| self.key(k)).collect();
        let mut conn = self.conn.clone();
        self.bounded(async move {
            let _: u64 = conn.del(keys).await?;
            Ok::<_, redis::RedisError>(())
        })
        .await
    }

    async fn increment_with_expiry(&self, key: &str, window: Duration) -> Result<u64> {
        let key = self.key(key);
        let seconds = i64::try_from(window.as_secs().max(1)).unwrap_or(i64::MAX);
        let mut conn = self.conn.clone();
        self.bounded(async move {
            let (count, ttl): (u64, i64) = redis::pipe()
                .atomic()
                .incr(&key, 1_u64)
                .ttl(&key)
                .query_async(&mut conn)
                .await?;
            if needs_expiry(ttl) {
                let _: bool = conn.expire(&key, seconds).await?;
            }
            Ok::<_, redis::RedisError>(count)
        })
        .await
    }
}

/// A counter without an expiry is (re)armed, so an `EXPIRE` lost to a
/// timeout is repaired by the next increment instead of pinning the window.
const fn needs_expiry(ttl: i64) -> bool {
    ttl < 0
}
