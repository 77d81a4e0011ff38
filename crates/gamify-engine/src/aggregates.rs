//! Aggregate counts for badge rules.
//!
//! Aggregate badges depend on data owned by several domains (quiz results,
//! scam checks, medication checks, community reactions). The engine only sees
//! them through [`AggregateCounter`], so each source can be swapped or faked
//! independently.

use std::sync::Arc;

use async_trait::async_trait;

use gamify_core::{ActionKind, AggregateMetric, UserId};
use gamify_store::{CountQuery, Store};

use crate::error::AggregateError;

/// Source of the per-user counts that gate aggregate badges.
#[async_trait]
pub trait AggregateCounter: Send + Sync {
    /// Current value of `metric` for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be queried.
    async fn count(&self, user_id: &UserId, metric: AggregateMetric)
        -> Result<u64, AggregateError>;
}

/// Counts everything from the ledger store.
///
/// Quiz answers and medication checks come from completion records; scam
/// checks and reactions come from activity counters fed by other services.
pub struct StoreAggregates {
    store: Arc<dyn Store>,
}

impl StoreAggregates {
    /// Create a counter reading from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The store query that answers `metric`.
    #[must_use]
    pub const fn query_for(metric: AggregateMetric) -> CountQuery {
        match metric {
            AggregateMetric::CorrectQuizAnswers => CountQuery::CorrectQuizAnswers,
            AggregateMetric::MedicationChecks => {
                CountQuery::Completions(Some(ActionKind::MedicationCheck))
            }
            AggregateMetric::ScamChecks | AggregateMetric::ReactionsReceived => {
                CountQuery::Activity(metric)
            }
        }
    }
}

#[async_trait]
impl AggregateCounter for StoreAggregates {
    async fn count(
        &self,
        user_id: &UserId,
        metric: AggregateMetric,
    ) -> Result<u64, AggregateError> {
        let count = self
            .store
            .count_matching(user_id, Self::query_for(metric))
            .await?;
        Ok(count)
    }
}
