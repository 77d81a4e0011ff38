//! Common test utilities for gamify-service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;

use gamify_cache::MemoryCache;
use gamify_core::UserId;
use gamify_service::{create_router, AppState, ServiceConfig, StoreBackend};
use gamify_store::{MemoryStore, Store};

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// A test user ID.
    pub test_user_id: UserId,
    /// The service API key for service-to-service requests.
    pub service_api_key: String,
    /// Temporary directory for on-disk stores (kept alive for test duration).
    pub _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    /// Create a harness over an in-memory store and cache.
    pub fn new() -> Self {
        Self::with_rate_limit(0)
    }

    /// Create a harness with a per-user claim rate limit (0 disables it).
    pub fn with_rate_limit(claims_per_minute: u64) -> Self {
        Self::build(Arc::new(MemoryStore::new()), claims_per_minute, None)
    }

    /// Create a harness backed by a fresh `RocksDB` store.
    #[cfg(feature = "rocksdb-backend")]
    pub fn with_rocks() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let store =
            gamify_store::RocksStore::open(temp_dir.path()).expect("Failed to open store");
        Self::build(Arc::new(store), 0, Some(temp_dir))
    }

    fn build(
        store: Arc<dyn Store>,
        claims_per_minute: u64,
        temp_dir: Option<tempfile::TempDir>,
    ) -> Self {
        let service_api_key = "test-service-key".to_string();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            store_backend: StoreBackend::Memory,
            service_api_key: Some(service_api_key.clone()),
            cors_origins: vec!["*".into()],
            claim_rate_limit_per_minute: claims_per_minute,
            ..ServiceConfig::default()
        };

        let state = AppState::new(store, Arc::new(MemoryCache::new()), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            test_user_id: UserId::generate(),
            service_api_key,
            _temp_dir: temp_dir,
        }
    }

    /// Path prefix for the test user's routes.
    pub fn user_path(&self, view: &str) -> String {
        format!("/v1/users/{}/{view}", self.test_user_id)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
