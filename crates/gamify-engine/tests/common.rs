//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use gamify_cache::{Cache, CacheError, MemoryCache};
use gamify_core::{AggregateMetric, CompletionRecord, TargetId, UserId, UserLedger};
use gamify_engine::{
    AggregateCounter, AggregateError, EngineConfig, GamificationEngine, StoreAggregates,
};
use gamify_store::{CommitOutcome, CountQuery, MemoryStore, Store, StoreError};

/// A cache where every call fails.
#[derive(Default)]
pub struct FailingCache {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Cache for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn set_with_ttl(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Timeout)
    }

    async fn delete(&self, _keys: &[String]) -> Result<(), CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Timeout)
    }

    async fn increment_with_expiry(&self, _key: &str, _window: Duration) -> Result<u64, CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Timeout)
    }
}

/// A memory cache whose first write to a key under `prefix` parks until
/// `release` gets a permit. `parked` fires when the write is parked.
pub struct StallingCache {
    pub inner: MemoryCache,
    pub parked: tokio::sync::Notify,
    pub release: tokio::sync::Semaphore,
    prefix: String,
    armed: AtomicBool,
}

impl StallingCache {
    pub fn stalling_writes_to(prefix: &str) -> Self {
        Self {
            inner: MemoryCache::new(),
            parked: tokio::sync::Notify::new(),
            release: tokio::sync::Semaphore::new(0),
            prefix: prefix.to_string(),
            armed: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl Cache for StallingCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.inner.get(key).await
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        if key.starts_with(&self.prefix) && self.armed.swap(false, Ordering::SeqCst) {
            self.parked.notify_one();
            self.release
                .acquire()
                .await
                .map_err(|_| CacheError::Unavailable("gate closed".into()))?
                .forget();
        }
        self.inner.set_with_ttl(key, value, ttl).await
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        self.inner.delete(keys).await
    }

    async fn increment_with_expiry(&self, key: &str, window: Duration) -> Result<u64, CacheError> {
        self.inner.increment_with_expiry(key, window).await
    }
}

/// An aggregate source where every query fails.
pub struct FailingAggregates;

#[async_trait]
impl AggregateCounter for FailingAggregates {
    async fn count(&self, _user_id: &UserId, _metric: AggregateMetric) -> Result<u64, AggregateError> {
        Err(AggregateError::Store(down()))
    }
}

/// A store where every call fails.
pub struct FailingStore;

fn down() -> StoreError {
    StoreError::Database("connection reset".into())
}

#[async_trait]
impl Store for FailingStore {
    async fn get_ledger(&self, _user_id: &UserId) -> gamify_store::Result<Option<UserLedger>> {
        Err(down())
    }

    async fn get_or_create_ledger(&self, _user_id: &UserId) -> gamify_store::Result<UserLedger> {
        Err(down())
    }

    async fn update_ledger(
        &self,
        _ledger: &UserLedger,
        _expected_revision: u64,
    ) -> gamify_store::Result<Option<UserLedger>> {
        Err(down())
    }

    async fn has_completion(
        &self,
        _user_id: &UserId,
        _target: &TargetId,
        _day: NaiveDate,
    ) -> gamify_store::Result<bool> {
        Err(down())
    }

    async fn insert_completion_if_absent(&self, _record: &CompletionRecord) -> gamify_store::Result<bool> {
        Err(down())
    }

    async fn commit_claim(
        &self,
        _record: &CompletionRecord,
        _ledger: &UserLedger,
        _expected_revision: u64,
    ) -> gamify_store::Result<CommitOutcome> {
        Err(down())
    }

    async fn count_matching(&self, _user_id: &UserId, _query: CountQuery) -> gamify_store::Result<u64> {
        Err(down())
    }

    async fn record_activity(
        &self,
        _user_id: &UserId,
        _metric: AggregateMetric,
        _amount: u64,
    ) -> gamify_store::Result<u64> {
        Err(down())
    }
}

/// A memory store that yields to the scheduler before every call, so
/// concurrent claims interleave between their read and their commit.
pub struct YieldingStore {
    pub inner: Arc<MemoryStore>,
}

#[async_trait]
impl Store for YieldingStore {
    async fn get_ledger(&self, user_id: &UserId) -> gamify_store::Result<Option<UserLedger>> {
        tokio::task::yield_now().await;
        self.inner.get_ledger(user_id).await
    }

    async fn get_or_create_ledger(&self, user_id: &UserId) -> gamify_store::Result<UserLedger> {
        tokio::task::yield_now().await;
        self.inner.get_or_create_ledger(user_id).await
    }

    async fn update_ledger(
        &self,
        ledger: &UserLedger,
        expected_revision: u64,
    ) -> gamify_store::Result<Option<UserLedger>> {
        tokio::task::yield_now().await;
        self.inner.update_ledger(ledger, expected_revision).await
    }

    async fn has_completion(
        &self,
        user_id: &UserId,
        target: &TargetId,
        day: NaiveDate,
    ) -> gamify_store::Result<bool> {
        tokio::task::yield_now().await;
        self.inner.has_completion(user_id, target, day).await
    }

    async fn insert_completion_if_absent(&self, record: &CompletionRecord) -> gamify_store::Result<bool> {
        tokio::task::yield_now().await;
        self.inner.insert_completion_if_absent(record).await
    }

    async fn commit_claim(
        &self,
        record: &CompletionRecord,
        ledger: &UserLedger,
        expected_revision: u64,
    ) -> gamify_store::Result<CommitOutcome> {
        tokio::task::yield_now().await;
        self.inner.commit_claim(record, ledger, expected_revision).await
    }

    async fn count_matching(&self, user_id: &UserId, query: CountQuery) -> gamify_store::Result<u64> {
        tokio::task::yield_now().await;
        self.inner.count_matching(user_id, query).await
    }

    async fn record_activity(
        &self,
        user_id: &UserId,
        metric: AggregateMetric,
        amount: u64,
    ) -> gamify_store::Result<u64> {
        tokio::task::yield_now().await;
        self.inner.record_activity(user_id, metric, amount).await
    }
}

/// Engine with default config over a [`YieldingStore`].
pub fn yielding_engine() -> (GamificationEngine, Arc<MemoryStore>) {
    let inner = Arc::new(MemoryStore::new());
    let store: Arc<dyn Store> = Arc::new(YieldingStore {
        inner: inner.clone(),
    });
    let engine = GamificationEngine::new(
        store.clone(),
        Arc::new(MemoryCache::new()),
        Arc::new(StoreAggregates::new(store)),
        EngineConfig::default(),
    );
    (engine, inner)
}

/// Engine wired to in-memory backends, with handles to inspect them.
pub struct Harness {
    pub engine: Arc<GamificationEngine>,
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryCache::new());
        let engine = Arc::new(GamificationEngine::new(
            store.clone(),
            cache.clone(),
            Arc::new(StoreAggregates::new(store.clone())),
            config,
        ));
        Self {
            engine,
            store,
            cache,
        }
    }
}

/// Engine over a memory store with a cache that always fails.
pub fn engine_with_failing_cache(store: Arc<MemoryStore>) -> GamificationEngine {
    GamificationEngine::new(
        store.clone(),
        Arc::new(FailingCache::default()),
        Arc::new(StoreAggregates::new(store)),
        EngineConfig::default(),
    )
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
}
