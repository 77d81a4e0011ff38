//! Error types for the engine.

use gamify_core::{GamifyError, UserId};
use gamify_store::StoreError;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced to callers of the engine.
///
/// A duplicate claim is not an error; it is reported as
/// [`crate::ClaimOutcome::AlreadyCredited`]. Cache failures never reach this
/// type.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The durable store failed. Nothing was credited; the call may be retried.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The action payload was rejected.
    #[error("invalid action: {0}")]
    InvalidAction(#[from] GamifyError),

    /// The ledger kept changing underneath the claim.
    #[error("ledger for {user_id} is contended after {attempts} attempts")]
    Contention {
        /// The contended user.
        user_id: UserId,
        /// Attempts made before giving up.
        attempts: u32,
    },
}

impl EngineError {
    /// Whether the caller can expect a retry to succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Contention { .. })
    }
}

/// Failure of an aggregate count query.
///
/// Badge evaluation treats this as "condition not met".
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    /// The backing store failed.
    #[error("aggregate query failed: {0}")]
    Store(#[from] StoreError),
}
