//! Application state.

use std::sync::Arc;

use gamify_cache::Cache;
use gamify_engine::{GamificationEngine, StoreAggregates};
use gamify_store::Store;

use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The gamification engine.
    pub engine: Arc<GamificationEngine>,

    /// Cache handle, used directly for claim rate limiting.
    pub cache: Arc<dyn Cache>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state over the given store and cache.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn Cache>, config: ServiceConfig) -> Self {
        let aggregates = Arc::new(StoreAggregates::new(store.clone()));
        let engine = Arc::new(GamificationEngine::new(
            store,
            cache.clone(),
            aggregates,
            config.engine.clone(),
        ));

        if config.service_api_key.is_none() {
            tracing::warn!("SERVICE_API_KEY not set - all /v1 requests will be rejected");
        }

        Self {
            engine,
            cache,
            config,
        }
    }
}
