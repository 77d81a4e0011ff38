//! Volatile cache for gamify.
//!
//! The cache is only ever an optimization. Nothing stored here is
//! authoritative, and every caller must treat a [`CacheError`] the same way it
//! treats a miss.
//!
//! # Backends
//!
//! - [`RedisCache`]: shared Redis instance, every call bounded by a timeout
//! - [`MemoryCache`]: process-local map with lazy expiry

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod redis_cache;

pub use error::{CacheError, Result};
pub use memory::MemoryCache;
pub use redis_cache::{CachePolicy, RedisCache};

use std::time::Duration;

use async_trait::async_trait;

/// Key/value store with TTL, multi-key delete and atomic counters.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Read a value. `Ok(None)` is a miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or times out.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a value that expires after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or times out.
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Delete every key in `keys`. Missing keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or times out.
    async fn delete(&self, keys: &[String]) -> Result<()>;

    /// Increment a counter and make sure it expires within `window`.
    ///
    /// Returns the value after the increment.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or times out.
    async fn increment_with_expiry(&self, key: &str, window: Duration) -> Result<u64>;
}
