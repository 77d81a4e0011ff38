//! Read-through cached views.
//!
//! Views are stored as JSON. Any cache failure (read, write or decode) falls
//! back to computing from the store, so a broken cache only costs latency.
//!
//! View keys carry the user's current generation
//! (`gamification:{view}:{user}:{generation}`). Invalidation replaces the
//! generation, so a reader that computed from pre-mutation state and writes
//! back afterwards lands under a generation nobody reads any more.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use gamify_cache::Cache;
use gamify_core::UserId;

use crate::config::ViewTtls;
use crate::error::Result;

/// A cached per-user view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Points, level, streaks, badges and completion counts.
    Stats,
    /// Level progress.
    Level,
    /// Unlocked badges.
    Badges,
}

impl View {
    /// Every view, for invalidation.
    pub const ALL: [Self; 3] = [Self::Stats, Self::Level, Self::Badges];

    /// Cache key of this view for a user at a generation.
    #[must_use]
    pub fn key(self, user_id: &UserId, generation: &str) -> String {
        let name = match self {
            Self::Stats => "stats",
            Self::Level => "level",
            Self::Badges => "badges",
        };
        format!("gamification:{name}:{user_id}:{generation}")
    }

    /// Lifetime of this view.
    #[must_use]
    pub const fn ttl(self, ttls: &ViewTtls) -> Duration {
        match self {
            Self::Stats => ttls.stats,
            Self::Level => ttls.level,
            Self::Badges => ttls.badges,
        }
    }
}

/// Generation of a user who has never been invalidated (or whose generation
/// key expired).
const INITIAL_GENERATION: &str = "0";

/// Lifetime of a generation key. Must outlive every view TTL so a view
/// written under the initial generation is gone before the generation can
/// fall back to it.
const GENERATION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

static GENERATION_SEQ: AtomicU64 = AtomicU64::new(0);

fn generation_key(user_id: &UserId) -> String {
    format!("gamification:gen:{user_id}")
}

/// A generation token that is never reused: wall-clock nanos plus a
/// process-local sequence.
fn next_generation() -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let seq = GENERATION_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{nanos:x}-{seq:x}")
}

/// Cached view reader and invalidator.
pub struct Projection {
    cache: Arc<dyn Cache>,
    ttls: ViewTtls,
}

impl Projection {
    /// Create a projection layer over `cache`.
    #[must_use]
    pub fn new(cache: Arc<dyn Cache>, ttls: ViewTtls) -> Self {
        Self { cache, ttls }
    }

    /// Return the cached `view` of a user, or compute, cache and return it.
    ///
    /// # Errors
    ///
    /// Returns whatever `compute` returns. Cache failures are not errors.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        view: View,
        user_id: &UserId,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let Some(generation) = self.generation(user_id).await else {
            return compute().await;
        };
        let key = view.key(user_id, &generation);

        match self.cache.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Discarding undecodable cached view");
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, computing view");
            }
        }

        let value = compute().await?;

        match serde_json::to_vec(&value) {
            Ok(bytes) => {
                if let Err(e) = self
                    .cache
                    .set_with_ttl(&key, &bytes, view.ttl(&self.ttls))
                    .await
                {
                    tracing::warn!(key = %key, error = %e, "Cache write failed");
                }
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to encode view");
            }
        }

        Ok(value)
    }

    /// Retire every cached view of a user. Failures are logged and swallowed.
    ///
    /// Moves the user to a fresh generation, then deletes the views of the
    /// previous one.
    pub async fn invalidate(&self, user_id: &UserId) {
        let previous = self
            .generation(user_id)
            .await
            .unwrap_or_else(|| INITIAL_GENERATION.to_string());

        if let Err(e) = self
            .cache
            .set_with_ttl(
                &generation_key(user_id),
                next_generation().as_bytes(),
                GENERATION_TTL,
            )
            .await
        {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to advance view generation");
        }

        let keys: Vec<String> = View::ALL.iter().map(|v| v.key(user_id, &previous)).collect();
        if let Err(e) = self.cache.delete(&keys).await {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to invalidate cached views");
        }
    }

    /// Current generation of a user, or `None` if it cannot be read, in
    /// which case the cache is bypassed.
    async fn generation(&self, user_id: &UserId) -> Option<String> {
        match self.cache.get(&generation_key(user_id)).await {
            Ok(Some(bytes)) => match String::from_utf8(bytes) {
                Ok(generation) => Some(generation),
                Err(_) => {
                    tracing::warn!(user_id = %user_id, "Undecodable view generation, bypassing cache");
                    None
                }
            },
            Ok(None) => Some(INITIAL_GENERATION.to_string()),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Cache read failed, computing view");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamify_cache::MemoryCache;

    fn projection() -> (Projection, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::new());
        (Projection::new(cache.clone(), ViewTtls::default()), cache)
    }

    #[test]
    fn keys_are_per_user_view_and_generation() {
        let user_id: UserId = "6f1c0c9e-3e57-4f43-9f3b-6c2d3d3a1b11".parse().unwrap();
        assert_eq!(
            View::Stats.key(&user_id, "0"),
            "gamification:stats:6f1c0c9e-3e57-4f43-9f3b-6c2d3d3a1b11:0"
        );
        assert_eq!(
            View::Level.key(&user_id, "1a-2"),
            "gamification:level:6f1c0c9e-3e57-4f43-9f3b-6c2d3d3a1b11:1a-2"
        );
        assert_eq!(View::Badges.ttl(&ViewTtls::default()), Duration::from_secs(3600));
        assert!(GENERATION_TTL > ViewTtls::default().badges);
    }

    #[test]
    fn generations_are_never_reused() {
        let a = next_generation();
        let b = next_generation();
        assert_ne!(a, b);
        assert_ne!(a, INITIAL_GENERATION);
    }

    #[tokio::test]
    async fn computes_once_then_serves_cache() {
        let (projection, _) = projection();
        let user_id = UserId::generate();

        let first: u64 = projection
            .get_or_compute(View::Stats, &user_id, || async { Ok(7) })
            .await
            .unwrap();
        let second: u64 = projection
            .get_or_compute(View::Stats, &user_id, || async { Ok(99) })
            .await
            .unwrap();
        assert_eq!(first, 7);
        assert_eq!(second, 7);
    }

    #[tokio::test]
    async fn invalidate_forces_recompute() {
        let (projection, cache) = projection();
        let user_id = UserId::generate();

        let _: u64 = projection
            .get_or_compute(View::Level, &user_id, || async { Ok(1) })
            .await
            .unwrap();
        projection.invalidate(&user_id).await;
        assert!(!cache.contains_key(&View::Level.key(&user_id, INITIAL_GENERATION)));

        let after: u64 = projection
            .get_or_compute(View::Level, &user_id, || async { Ok(2) })
            .await
            .unwrap();
        assert_eq!(after, 2);
    }

    #[tokio::test]
    async fn write_back_racing_an_invalidation_is_not_served() {
        let (projection, _) = projection();
        let user_id = UserId::generate();

        // The mutation commits and invalidates while this reader is still
        // computing from the old state.
        let stale: u64 = projection
            .get_or_compute(View::Stats, &user_id, || async {
                projection.invalidate(&user_id).await;
                Ok(0)
            })
            .await
            .unwrap();
        assert_eq!(stale, 0);

        let fresh: u64 = projection
            .get_or_compute(View::Stats, &user_id, || async { Ok(2) })
            .await
            .unwrap();
        assert_eq!(fresh, 2);
    }

    #[tokio::test]
    async fn garbage_in_cache_is_recomputed() {
        let (projection, cache) = projection();
        let user_id = UserId::generate();
        cache
            .set_with_ttl(
                &View::Badges.key(&user_id, INITIAL_GENERATION),
                b"{not json",
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let value: Vec<String> = projection
            .get_or_compute(View::Badges, &user_id, || async {
                Ok(vec!["first_step".to_string()])
            })
            .await
            .unwrap();
        assert_eq!(value, vec!["first_step".to_string()]);
    }
}
