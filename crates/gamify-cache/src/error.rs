//! Error types for the cache layer.

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors that can occur in cache operations. All of them are recoverable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The operation did not finish within the configured timeout.
    #[error("cache operation timed out")]
    Timeout,

    /// The backend could not be reached.
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected the command.
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            Self::Unavailable(err.to_string())
        } else if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Backend(err.to_string())
        }
    }
}
