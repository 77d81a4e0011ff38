//! Error types for gamify.

use crate::ids::IdError;

/// Result type for gamify core operations.
pub type Result<T> = std::result::Result<T, GamifyError>;

/// Errors raised while validating actions and identifiers.
#[derive(Debug, thiserror::Error)]
pub enum GamifyError {
    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// The action payload is inconsistent.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// A badge id that this version does not know.
    #[error("unknown badge: {0}")]
    UnknownBadge(String),

    /// An aggregate metric name that this version does not know.
    #[error("unknown aggregate metric: {0}")]
    UnknownMetric(String),
}
