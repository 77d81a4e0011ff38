//! Idempotency guard.
//!
//! Presence of a cache marker is enough to answer "already credited". Absence
//! or a cache failure is never trusted: the completion table is consulted
//! instead. The final word belongs to the uniqueness constraint behind
//! [`gamify_store::Store::commit_claim`].

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use gamify_cache::Cache;
use gamify_core::{TargetId, UserId};
use gamify_store::{Store, StoreError};

/// Marker value. Only key presence matters.
const MARKER: &[u8] = b"1";

/// Result of the pre-commit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardCheck {
    /// A completion exists for the triple.
    AlreadyClaimed,
    /// No completion was found. The claim may proceed to commit.
    Unclaimed,
}

/// Cache key of the claim marker for `(user, target, day)`.
#[must_use]
pub fn marker_key(user_id: &UserId, target: &TargetId, day: NaiveDate) -> String {
    format!("completed:{user_id}:{target}:{}", day.format("%Y-%m-%d"))
}

/// Fast-path plus durable pre-check for claims.
pub struct IdempotencyGuard {
    store: Arc<dyn Store>,
    cache: Arc<dyn Cache>,
    marker_ttl: Duration,
}

impl IdempotencyGuard {
    /// Create a guard over the given handles.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn Cache>, marker_ttl: Duration) -> Self {
        Self {
            store,
            cache,
            marker_ttl,
        }
    }

    /// Check whether the triple has already been credited.
    ///
    /// # Errors
    ///
    /// Returns an error only if the durable check fails.
    pub async fn check(
        &self,
        user_id: &UserId,
        target: &TargetId,
        day: NaiveDate,
    ) -> Result<GuardCheck, StoreError> {
        let key = marker_key(user_id, target, day);

        match self.cache.get(&key).await {
            Ok(Some(_)) => {
                tracing::debug!(user_id = %user_id, target = %target, %day, "Claim marker hit");
                return Ok(GuardCheck::AlreadyClaimed);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    target = %target,
                    error = %e,
                    "Claim marker lookup failed, falling back to store"
                );
            }
        }

        if self.store.has_completion(user_id, target, day).await? {
            self.write_marker(&key).await;
            return Ok(GuardCheck::AlreadyClaimed);
        }

        Ok(GuardCheck::Unclaimed)
    }

    /// Record that the triple is credited. Best-effort.
    pub async fn mark_claimed(&self, user_id: &UserId, target: &TargetId, day: NaiveDate) {
        self.write_marker(&marker_key(user_id, target, day)).await;
    }

    async fn write_marker(&self, key: &str) {
        if let Err(e) = self.cache.set_with_ttl(key, MARKER, self.marker_ttl).await {
            tracing::warn!(key = %key, error = %e, "Failed to write claim marker");
        }
    }
}
