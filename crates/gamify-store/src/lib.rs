//! Durable ledger storage for gamify.
//!
//! This crate provides persistent storage for user ledgers, completion
//! records and cross-domain activity counters.
//!
//! # Backends
//!
//! - [`MemoryStore`]: process-local, for tests and single-node development
//! - `RocksStore`: embedded `RocksDB` with column families (feature `rocksdb-backend`)
//! - [`PgStore`]: `PostgreSQL` with a primary-key uniqueness constraint on completions
//!
//! # Claim semantics
//!
//! The uniqueness of `(user, target, day)` is the only authority on whether an
//! action has been credited. [`Store::commit_claim`] inserts the completion and
//! writes the ledger in a single atomic step, and only if the ledger revision
//! still matches the one the caller computed against.
//!
//! # Example
//!
//! ```no_run
//! use gamify_core::UserId;
//! use gamify_store::{MemoryStore, Store};
//!
//! # async fn demo() -> gamify_store::Result<()> {
//! let store = MemoryStore::new();
//! let user_id = UserId::generate();
//! let ledger = store.get_or_create_ledger(&user_id).await?;
//! assert_eq!(ledger.total_points, 0);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
#[cfg(feature = "rocksdb-backend")]
pub mod keys;
pub mod memory;
pub mod postgres;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
#[cfg(feature = "rocksdb-backend")]
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use async_trait::async_trait;
use chrono::NaiveDate;

use gamify_core::{ActionKind, AggregateMetric, CompletionRecord, TargetId, UserId, UserLedger};

/// Result of an atomic claim commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The completion was inserted and the ledger written. Holds the stored ledger.
    Committed(UserLedger),
    /// A completion for the same `(user, target, day)` already exists. Nothing was written.
    Duplicate,
    /// The ledger revision moved since it was read. Nothing was written.
    Conflict,
}

/// What to count for aggregate queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountQuery {
    /// Number of completion records, optionally restricted to one action kind.
    Completions(Option<ActionKind>),
    /// Sum of correct quiz answers across all completion records.
    CorrectQuizAnswers,
    /// A cross-domain activity counter recorded through [`Store::record_activity`].
    Activity(AggregateMetric),
}

/// The storage trait defining all durable operations.
///
/// Implementations must make [`Store::commit_claim`] atomic: either both the
/// completion row and the ledger row are written, or neither is.
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Ledger Operations
    // =========================================================================

    /// Get a ledger by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_ledger(&self, user_id: &UserId) -> Result<Option<UserLedger>>;

    /// Get a ledger, creating an empty one if the user has none yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_or_create_ledger(&self, user_id: &UserId) -> Result<UserLedger>;

    /// Overwrite a ledger if its stored revision equals `expected_revision`.
    ///
    /// Returns the stored ledger (with its revision bumped), or `None` if the
    /// revision did not match.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the ledger doesn't exist.
    async fn update_ledger(
        &self,
        ledger: &UserLedger,
        expected_revision: u64,
    ) -> Result<Option<UserLedger>>;

    // =========================================================================
    // Completion Operations
    // =========================================================================

    /// Check whether `(user, target, day)` has already been credited.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn has_completion(
        &self,
        user_id: &UserId,
        target: &TargetId,
        day: NaiveDate,
    ) -> Result<bool>;

    /// Insert a completion unless its key already exists.
    ///
    /// Returns `true` if the record was inserted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_completion_if_absent(&self, record: &CompletionRecord) -> Result<bool>;

    // =========================================================================
    // Compound Operations
    // =========================================================================

    /// Insert `record` and write `ledger` atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the ledger doesn't exist.
    /// - `StoreError::Database` if the write fails.
    async fn commit_claim(
        &self,
        record: &CompletionRecord,
        ledger: &UserLedger,
        expected_revision: u64,
    ) -> Result<CommitOutcome>;

    // =========================================================================
    // Aggregate Operations
    // =========================================================================

    /// Count rows matching `query` for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn count_matching(&self, user_id: &UserId, query: CountQuery) -> Result<u64>;

    /// Add `amount` to a cross-domain activity counter, returning the new total.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn record_activity(
        &self,
        user_id: &UserId,
        metric: AggregateMetric,
        amount: u64,
    ) -> Result<u64>;
}

/// Stamp a ledger for writing: bump the revision and refresh `updated_at`.
pub(crate) fn next_revision(ledger: &UserLedger, expected_revision: u64) -> UserLedger {
    let mut stored = ledger.clone();
    stored.revision = expected_revision + 1;
    stored.updated_at = chrono::Utc::now();
    stored
}
