//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//! Compound writes go through a single `WriteBatch`. Read-check-write
//! sequences are serialized by `write_lock`, which plays the role of the
//! uniqueness constraint for this embedded backend.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use gamify_core::{AggregateMetric, CompletionRecord, TargetId, UserId, UserLedger};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{next_revision, CommitOutcome, CountQuery, Store};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn read_ledger(&self, user_id: &UserId) -> Result<Option<UserLedger>> {
        let cf = self.cf(cf::LEDGERS)?;
        self.db
            .get_cf(&cf, keys::ledger_key(user_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn completion_exists(&self, key: &[u8]) -> Result<bool> {
        let cf = self.cf(cf::COMPLETIONS)?;
        let exists = self
            .db
            .get_pinned_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();
        Ok(exists)
    }

    fn read_counter(&self, key: &[u8]) -> Result<u64> {
        let cf = self.cf(cf::ACTIVITY)?;
        let Some(raw) = self
            .db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(0);
        };
        let bytes: [u8; 8] = raw
            .as_slice()
            .try_into()
            .map_err(|_| StoreError::Serialization("activity counter is not 8 bytes".into()))?;
        Ok(u64::from_be_bytes(bytes))
    }

    /// Load every completion record of a user.
    fn user_completions(&self, user_id: &UserId) -> Result<Vec<CompletionRecord>> {
        let cf = self.cf(cf::COMPLETIONS)?;
        let prefix = keys::user_prefix(user_id);

        let iter = self.db.iterator_cf(
            &cf,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        let mut records = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            records.push(Self::deserialize(&value)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl Store for RocksStore {
    // =========================================================================
    // Ledger Operations
    // =========================================================================

    async fn get_ledger(&self, user_id: &UserId) -> Result<Option<UserLedger>> {
        self.read_ledger(user_id)
    }

    async fn get_or_create_ledger(&self, user_id: &UserId) -> Result<UserLedger> {
        if let Some(ledger) = self.read_ledger(user_id)? {
            return Ok(ledger);
        }

        let _guard = self.write_lock.lock();
        if let Some(ledger) = self.read_ledger(user_id)? {
            return Ok(ledger);
        }

        let ledger = UserLedger::new(*user_id);
        let cf = self.cf(cf::LEDGERS)?;
        self.db
            .put_cf(&cf, keys::ledger_key(user_id), Self::serialize(&ledger)?)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(user_id = %user_id, "Created ledger");
        Ok(ledger)
    }

    async fn update_ledger(
        &self,
        ledger: &UserLedger,
        expected_revision: u64,
    ) -> Result<Option<UserLedger>> {
        let _guard = self.write_lock.lock();

        let current = self
            .read_ledger(&ledger.user_id)?
            .ok_or(StoreError::NotFound)?;
        if current.revision != expected_revision {
            return Ok(None);
        }

        let stored = next_revision(ledger, expected_revision);
        let cf = self.cf(cf::LEDGERS)?;
        self.db
            .put_cf(&cf, keys::ledger_key(&stored.user_id), Self::serialize(&stored)?)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Some(stored))
    }

    // =========================================================================
    // Completion Operations
    // =========================================================================

    async fn has_completion(
        &self,
        user_id: &UserId,
        target: &TargetId,
        day: NaiveDate,
    ) -> Result<bool> {
        self.completion_exists(&keys::completion_key(user_id, target, day))
    }

    async fn insert_completion_if_absent(&self, record: &CompletionRecord) -> Result<bool> {
        let key = keys::completion_key(&record.user_id, &record.target, record.day);
        let _guard = self.write_lock.lock();

        if self.completion_exists(&key)? {
            return Ok(false);
        }

        let cf = self.cf(cf::COMPLETIONS)?;
        self.db
            .put_cf(&cf, key, Self::serialize(record)?)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(true)
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    async fn commit_claim(
        &self,
        record: &CompletionRecord,
        ledger: &UserLedger,
        expected_revision: u64,
    ) -> Result<CommitOutcome> {
        let completion_key = keys::completion_key(&record.user_id, &record.target, record.day);
        let ledger_key = keys::ledger_key(&ledger.user_id);

        let _guard = self.write_lock.lock();

        if self.completion_exists(&completion_key)? {
            return Ok(CommitOutcome::Duplicate);
        }

        let current = self
            .read_ledger(&ledger.user_id)?
            .ok_or(StoreError::NotFound)?;
        if current.revision != expected_revision {
            return Ok(CommitOutcome::Conflict);
        }

        let stored = next_revision(ledger, expected_revision);

        let cf_ledgers = self.cf(cf::LEDGERS)?;
        let cf_completions = self.cf(cf::COMPLETIONS)?;

        // Write atomically
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_completions, &completion_key, Self::serialize(record)?);
        batch.put_cf(&cf_ledgers, &ledger_key, Self::serialize(&stored)?);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(CommitOutcome::Committed(stored))
    }

    // =========================================================================
    // Aggregate Operations
    // =========================================================================

    async fn count_matching(&self, user_id: &UserId, query: CountQuery) -> Result<u64> {
        let count = match query {
            CountQuery::Activity(metric) => self.read_counter(&keys::activity_key(user_id, metric))?,
            CountQuery::Completions(kind) => self
                .user_completions(user_id)?
                .iter()
                .filter(|r| kind.map_or(true, |k| r.kind == k))
                .count() as u64,
            CountQuery::CorrectQuizAnswers => self
                .user_completions(user_id)?
                .iter()
                .filter_map(|r| r.score)
                .map(|s| u64::from(s.correct))
                .sum(),
        };
        Ok(count)
    }

    async fn record_activity(
        &self,
        user_id: &UserId,
        metric: AggregateMetric,
        amount: u64,
    ) -> Result<u64> {
        let key = keys::activity_key(user_id, metric);
        let _guard = self.write_lock.lock();

        let total = self.read_counter(&key)?.saturating_add(amount);
        let cf = self.cf(cf::ACTIVITY)?;
        self.db
            .put_cf(&cf, key, total.to_be_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamify_core::{ActionKind, QuizScore};
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn record(user_id: UserId, target: TargetId, day: NaiveDate, kind: ActionKind) -> CompletionRecord {
        CompletionRecord {
            user_id,
            target,
            day,
            kind,
            score: (kind == ActionKind::LearningCard).then_some(QuizScore {
                correct: 2,
                total: 3,
            }),
            points_awarded: 9,
            recorded_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn ledger_lifecycle() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();

        assert!(store.get_ledger(&user_id).await.unwrap().is_none());
        let mut ledger = store.get_or_create_ledger(&user_id).await.unwrap();
        assert_eq!(ledger.revision, 0);

        ledger.total_points = 42;
        ledger.last_activity_date = Some(day(3));
        let stored = store.update_ledger(&ledger, 0).await.unwrap().unwrap();
        assert_eq!(stored.revision, 1);

        let reread = store.get_ledger(&user_id).await.unwrap().unwrap();
        assert_eq!(reread.total_points, 42);
        assert_eq!(reread.last_activity_date, Some(day(3)));

        // Stale revision is refused
        assert!(store.update_ledger(&ledger, 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn claim_is_unique_per_user_target_day() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        let ledger = store.get_or_create_ledger(&user_id).await.unwrap();
        let target = TargetId::card("c1").unwrap();
        let rec = record(user_id, target.clone(), day(10), ActionKind::LearningCard);

        let first = store.commit_claim(&rec, &ledger, 0).await.unwrap();
        assert!(matches!(first, CommitOutcome::Committed(ref l) if l.revision == 1));
        assert!(store.has_completion(&user_id, &target, day(10)).await.unwrap());

        let current = store.get_ledger(&user_id).await.unwrap().unwrap();
        let second = store.commit_claim(&rec, &current, 1).await.unwrap();
        assert_eq!(second, CommitOutcome::Duplicate);

        // Ledger untouched by the duplicate
        let after = store.get_ledger(&user_id).await.unwrap().unwrap();
        assert_eq!(after.revision, 1);
    }

    #[tokio::test]
    async fn stale_revision_writes_nothing() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        let ledger = store.get_or_create_ledger(&user_id).await.unwrap();
        let a = record(user_id, TargetId::card("a").unwrap(), day(10), ActionKind::LearningCard);
        let b = record(user_id, TargetId::card("b").unwrap(), day(10), ActionKind::LearningCard);

        store.commit_claim(&a, &ledger, 0).await.unwrap();
        let outcome = store.commit_claim(&b, &ledger, 0).await.unwrap();
        assert_eq!(outcome, CommitOutcome::Conflict);
        assert!(!store
            .has_completion(&user_id, &b.target, b.day)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn counts_are_scoped_to_user() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        let other = UserId::generate();

        for (i, kind) in [ActionKind::LearningCard, ActionKind::MedicationCheck]
            .into_iter()
            .enumerate()
        {
            let target = TargetId::new(format!("t{i}")).unwrap();
            store
                .insert_completion_if_absent(&record(user_id, target, day(5), kind))
                .await
                .unwrap();
        }
        store
            .insert_completion_if_absent(&record(
                other,
                TargetId::card("x").unwrap(),
                day(5),
                ActionKind::LearningCard,
            ))
            .await
            .unwrap();

        assert_eq!(
            store.count_matching(&user_id, CountQuery::Completions(None)).await.unwrap(),
            2
        );
        assert_eq!(
            store
                .count_matching(&user_id, CountQuery::Completions(Some(ActionKind::MedicationCheck)))
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            store.count_matching(&user_id, CountQuery::CorrectQuizAnswers).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn activity_counters_accumulate() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();

        assert_eq!(
            store
                .count_matching(&user_id, CountQuery::Activity(AggregateMetric::ReactionsReceived))
                .await
                .unwrap(),
            0
        );
        store
            .record_activity(&user_id, AggregateMetric::ReactionsReceived, 3)
            .await
            .unwrap();
        let total = store
            .record_activity(&user_id, AggregateMetric::ReactionsReceived, 2)
            .await
            .unwrap();
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn ledger_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let user_id = UserId::generate();
        {
            let store = RocksStore::open(dir.path()).unwrap();
            let mut ledger = store.get_or_create_ledger(&user_id).await.unwrap();
            ledger.total_points = 120;
            store.update_ledger(&ledger, 0).await.unwrap();
        }
        let store = RocksStore::open(dir.path()).unwrap();
        let ledger = store.get_ledger(&user_id).await.unwrap().unwrap();
        assert_eq!(ledger.total_points, 120);
        assert_eq!(ledger.level(), 2);
    }
}
