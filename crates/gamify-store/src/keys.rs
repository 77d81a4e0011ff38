//! Key encoding utilities for `RocksDB`.
//!
//! All per-user keys start with the 16 UUID bytes of the user so that a
//! prefix scan returns exactly that user's rows.

use chrono::NaiveDate;

use gamify_core::{AggregateMetric, TargetId, UserId};

/// Create a ledger key from a user ID.
#[must_use]
pub fn ledger_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a completion key.
///
/// Format: `user_id (16 bytes) || day (YYYYMMDD, 8 bytes) || target (utf-8)`
#[must_use]
pub fn completion_key(user_id: &UserId, target: &TargetId, day: NaiveDate) -> Vec<u8> {
    let target = target.as_str().as_bytes();
    let mut key = Vec::with_capacity(24 + target.len());
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(day.format("%Y%m%d").to_string().as_bytes());
    key.extend_from_slice(target);
    key
}

/// Create a prefix for iterating all completions of a user.
#[must_use]
pub fn user_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create an activity counter key.
///
/// Format: `user_id (16 bytes) || metric name (utf-8)`
#[must_use]
pub fn activity_key(user_id: &UserId, metric: AggregateMetric) -> Vec<u8> {
    let name = metric.as_str().as_bytes();
    let mut key = Vec::with_capacity(16 + name.len());
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(name);
    key
}
