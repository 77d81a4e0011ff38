//! In-process cache backend.
//!
//! Entries expire lazily: an expired entry is dropped the next time it is
//! touched, and every [`SWEEP_EVERY_WRITES`] writes the whole map is swept so
//! keys that are never read again are still reclaimed. Used when no Redis URL
//! is configured, and in tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::Result;
use crate::Cache;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Number of writes between full sweeps of expired entries.
pub const SWEEP_EVERY_WRITES: u64 = 1024;

/// Process-local cache backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
    writes: AtomicU64,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.is_live(now)).count()
    }

    /// Returns `true` if there are no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `key` holds a live entry.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries.get(key).is_some_and(|e| e.is_live(now))
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    /// Count a write and sweep when the interval is reached. Must not be
    /// called while a map guard is held.
    fn after_write(&self) {
        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % SWEEP_EVERY_WRITES == 0 {
            let purged = self.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "Swept expired cache entries");
            }
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        let value = match self.entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => None,
            None => return Ok(None),
        };
        if value.is_none() {
            self.entries.remove_if(key, |_, e| !e.is_live(now));
        }
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        self.after_write();
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.entries.remove(key);
        }
        Ok(())
    }

    async fn increment_with_expiry(&self, key: &str, window: Duration) -> Result<u64> {
        let now = Instant::now();
        let count = match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) if occupied.get().is_live(now) => {
                let entry = occupied.get_mut();
                let next = decode_counter(&entry.value).saturating_add(1);
                entry.value = next.to_string().into_bytes();
                next
            }
            Entry::Occupied(mut occupied) => {
                occupied.insert(CacheEntry {
                    value: b"1".to_vec(),
                    expires_at: now + window,
                });
                1
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry {
                    value: b"1".to_vec(),
                    expires_at: now + window,
                });
                1
            }
        };
        self.after_write();
        Ok(count)
    }
}

/// Counters are stored as ASCII decimal, matching Redis `INCR`.
fn decode_counter(raw: &[u8]) -> u64 {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}
