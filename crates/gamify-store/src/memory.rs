//! In-memory storage implementation.
//!
//! All state sits behind one mutex, so every operation (including the
//! compound claim) is trivially atomic. The lock is never held across an
//! `.await`.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;

use gamify_core::{AggregateMetric, CompletionRecord, TargetId, UserId, UserLedger};

use crate::error::{Result, StoreError};
use crate::{next_revision, CommitOutcome, CountQuery, Store};

type CompletionKey = (UserId, TargetId, NaiveDate);

#[derive(Default)]
struct Inner {
    ledgers: HashMap<UserId, UserLedger>,
    completions: BTreeMap<CompletionKey, CompletionRecord>,
    activity: HashMap<(UserId, AggregateMetric), u64>,
}

/// Process-local storage backend.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completion records held for a user.
    #[must_use]
    pub fn completion_count(&self, user_id: &UserId) -> usize {
        self.inner
            .lock()
            .completions
            .keys()
            .filter(|(u, _, _)| u == user_id)
            .count()
    }
}

fn completion_key(record: &CompletionRecord) -> CompletionKey {
    (record.user_id, record.target.clone(), record.day)
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_ledger(&self, user_id: &UserId) -> Result<Option<UserLedger>> {
        Ok(self.inner.lock().ledgers.get(user_id).cloned())
    }

    async fn get_or_create_ledger(&self, user_id: &UserId) -> Result<UserLedger> {
        let mut inner = self.inner.lock();
        let ledger = inner
            .ledgers
            .entry(*user_id)
            .or_insert_with(|| UserLedger::new(*user_id));
        Ok(ledger.clone())
    }

    async fn update_ledger(
        &self,
        ledger: &UserLedger,
        expected_revision: u64,
    ) -> Result<Option<UserLedger>> {
        let mut inner = self.inner.lock();
        let current = inner
            .ledgers
            .get_mut(&ledger.user_id)
            .ok_or(StoreError::NotFound)?;

        if current.revision != expected_revision {
            return Ok(None);
        }

        *current = next_revision(ledger, expected_revision);
        Ok(Some(current.clone()))
    }

    async fn has_completion(
        &self,
        user_id: &UserId,
        target: &TargetId,
        day: NaiveDate,
    ) -> Result<bool> {
        let key = (*user_id, target.clone(), day);
        Ok(self.inner.lock().completions.contains_key(&key))
    }

    async fn insert_completion_if_absent(&self, record: &CompletionRecord) -> Result<bool> {
        let mut inner = self.inner.lock();
        let key = completion_key(record);
        if inner.completions.contains_key(&key) {
            return Ok(false);
        }
        inner.completions.insert(key, record.clone());
        Ok(true)
    }

    async fn commit_claim(
        &self,
        record: &CompletionRecord,
        ledger: &UserLedger,
        expected_revision: u64,
    ) -> Result<CommitOutcome> {
        let mut inner = self.inner.lock();
        let key = completion_key(record);

        if inner.completions.contains_key(&key) {
            return Ok(CommitOutcome::Duplicate);
        }

        let current = inner
            .ledgers
            .get(&ledger.user_id)
            .ok_or(StoreError::NotFound)?;
        if current.revision != expected_revision {
            return Ok(CommitOutcome::Conflict);
        }

        let stored = next_revision(ledger, expected_revision);
        inner.completions.insert(key, record.clone());
        inner.ledgers.insert(stored.user_id, stored.clone());

        Ok(CommitOutcome::Committed(stored))
    }

    async fn count_matching(&self, user_id: &UserId, query: CountQuery) -> Result<u64> {
        let inner = self.inner.lock();
        let records = inner
            .completions
            .values()
            .filter(|r| r.user_id == *user_id);

        let count = match query {
            CountQuery::Completions(None) => records.count() as u64,
            CountQuery::Completions(Some(kind)) => {
                records.filter(|r| r.kind == kind).count() as u64
            }
            CountQuery::CorrectQuizAnswers => records
                .filter_map(|r| r.score)
                .map(|s| u64::from(s.correct))
                .sum(),
            CountQuery::Activity(metric) => {
                inner.activity.get(&(*user_id, metric)).copied().unwrap_or(0)
            }
        };

        Ok(count)
    }

    async fn record_activity(
        &self,
        user_id: &UserId,
        metric: AggregateMetric,
        amount: u64,
    ) -> Result<u64> {
        let mut inner = self.inner.lock();
        let counter = inner.activity.entry((*user_id, metric)).or_insert(0);
        *counter = counter.saturating_add(amount);
        Ok(*counter)
    }
}
