//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// User ledgers, keyed by `user_id`.
    pub const LEDGERS: &str = "ledgers";

    /// Completion records, keyed by `user_id || day || target`.
    /// Key presence is the uniqueness constraint.
    pub const COMPLETIONS: &str = "completions";

    /// Cross-domain activity counters, keyed by `user_id || metric`.
    /// Values are big-endian `u64`.
    pub const ACTIVITY: &str = "activity";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::LEDGERS, cf::COMPLETIONS, cf::ACTIVITY]
}
