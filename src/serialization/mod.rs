//! Postcard-based cache serialization with versioned envelopes.
//!
//! Every cached response body is wrapped in a small envelope before it is
//! handed to a backend:
//!
//! ```text
//! ┌─────────────────┬─────────────────┬──────────────────────────┐
//! │  MAGIC (4 bytes)│VERSION (4 bytes)│POSTCARD PAYLOAD (N bytes)│
//! └─────────────────┴─────────────────┴──────────────────────────┘
//!   "CIVC"              u32 (LE)          postcard::to_allocvec(T)
//! ```
//!
//! The envelope buys three guarantees:
//! - **Deterministic:** the same value always produces identical bytes
//! - **Validated:** magic and version are checked on every deserialization,
//!   so foreign or corrupted data in a cache key is rejected, never decoded
//! - **Versioned:** a schema change evicts old entries instead of silently
//!   misreading them

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Magic header for civic-cache entries: b"CIVC"
///
/// Any entry without this signature is rejected during deserialization.
pub const CACHE_MAGIC: [u8; 4] = *b"CIVC";

/// Current schema version.
///
/// Increment when making breaking changes to cached types (adding/removing
/// fields, changing types, reordering). Old entries are then evicted and
/// recomputed from the source of truth on next access.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Versioned envelope for cache entries.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CacheEnvelope<T> {
    /// Magic header: must be b"CIVC"
    pub magic: [u8; 4],
    /// Schema version: must match CURRENT_SCHEMA_VERSION
    pub version: u32,
    /// The actual cached data
    pub payload: T,
}

impl<T> CacheEnvelope<T> {
    /// Create a new envelope with current magic and version.
    pub fn new(payload: T) -> Self {
        Self {
            magic: CACHE_MAGIC,
            version: CURRENT_SCHEMA_VERSION,
            payload,
        }
    }
}

/// Serialize a value with envelope for cache storage.
///
/// This is the canonical way to serialize data for cache storage; all
/// backends receive bytes produced here.
///
/// # Errors
///
/// Returns `Error::SerializationError` if Postcard serialization fails.
pub fn serialize_for_cache<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let envelope = CacheEnvelope::new(value);
    postcard::to_allocvec(&envelope).map_err(|e| {
        log::error!("Cache serialization failed: {}", e);
        Error::SerializationError(e.to_string())
    })
}

/// Deserialize a value from cache storage with validation.
///
/// Validates magic and schema version before the payload is trusted.
///
/// # Errors
///
/// - `Error::InvalidCacheEntry`: invalid magic header
/// - `Error::VersionMismatch`: schema version mismatch
/// - `Error::DeserializationError`: corrupted Postcard payload
pub fn deserialize_from_cache<'de, T: Deserialize<'de>>(bytes: &'de [u8]) -> Result<T> {
    let envelope: CacheEnvelope<T> = postcard::from_bytes(bytes).map_err(|e| {
        log::error!("Cache deserialization failed: {}", e);
        Error::DeserializationError(e.to_string())
    })?;

    if envelope.magic != CACHE_MAGIC {
        log::warn!(
            "Invalid cache entry: expected magic {:?}, got {:?}",
            CACHE_MAGIC,
            envelope.magic
        );
        return Err(Error::InvalidCacheEntry(format!(
            "Invalid magic: expected {:?}, got {:?}",
            CACHE_MAGIC, envelope.magic
        )));
    }

    if envelope.version != CURRENT_SCHEMA_VERSION {
        log::warn!(
            "Cache version mismatch: expected {}, got {}",
            CURRENT_SCHEMA_VERSION,
            envelope.version
        );
        return Err(Error::VersionMismatch {
            expected: CURRENT_SCHEMA_VERSION,
            found: envelope.version,
        });
    }

    Ok(envelope.payload)
}
