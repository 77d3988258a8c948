//! Error types for the response-cache layer.

use std::fmt;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the cache layer.
///
/// These errors circulate between the backends and the store adapter only.
/// The adapter absorbs every one of them before the HTTP layer is reached:
/// a request is never failed because the cache is.
#[derive(Debug, Clone)]
pub enum Error {
    /// Serialization failed when converting a response payload to cache bytes.
    SerializationError(String),

    /// Deserialization failed when converting cache bytes back to a payload.
    ///
    /// Indicates corrupted or malformed data in the cache. The entry is
    /// evicted and the request proceeds as a miss.
    DeserializationError(String),

    /// Backend storage error (Redis unavailable, connection lost, etc).
    ///
    /// **Recovery:** the store adapter degrades to miss/no-op and flips its
    /// connected flag; the source of truth remains the database.
    BackendError(String),

    /// Operation exceeded the configured command timeout.
    ///
    /// Treated identically to `BackendError` by the store adapter.
    Timeout(String),

    /// Configuration error during initialization.
    ///
    /// Common causes: invalid connection string, malformed environment
    /// variables, zero-sized pool.
    ConfigError(String),

    /// Invalid cache entry: corrupted envelope or bad magic.
    ///
    /// Returned when the magic header is not `b"CIVC"` or the envelope fails
    /// to decode. The entry is evicted and recomputed.
    InvalidCacheEntry(String),

    /// Schema version mismatch between code and cached data.
    ///
    /// Expected during deployments that change the cached payload shape; the
    /// entry is evicted and recomputed on next access.
    VersionMismatch {
        /// Expected schema version (from compiled code)
        expected: u32,
        /// Found schema version (from the cached entry)
        found: u32,
    },

    /// Feature not implemented or not enabled (e.g. `redis` Cargo feature).
    NotImplemented(String),

    /// Generic error with custom message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::InvalidCacheEntry(msg) => write!(f, "Invalid cache entry: {}", msg),
            Error::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Cache version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            Error::NotImplemented(msg) => write!(f, "Not implemented: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::BackendError(e.to_string())
        } else if e.is_syntax() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::BackendError(e.to_string())
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::BackendError(format!("Redis error: {}", e))
    }
}
