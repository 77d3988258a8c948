//! Cache backend implementations.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub mod inmemory;
#[cfg(feature = "redis")]
pub mod redis;

pub use inmemory::InMemoryBackend;
#[cfg(feature = "redis")]
pub use redis::{PoolStats, RedisBackend, RedisConfig};

/// Raw storage statistics reported by a backend.
///
/// Consumed by the health surface only, never on the request hot path.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of live keys in the store.
    pub total_entries: u64,
    /// Payload bytes held, where the backend can report it.
    pub total_bytes: Option<u64>,
    /// Key count per namespace (first `:`-segment of each key), where the
    /// backend can enumerate keys cheaply. Empty for backends that cannot.
    pub namespaces: HashMap<String, u64>,
}

/// Trait for cache backend implementations.
///
/// Abstracts storage operations, allowing swappable backends behind the
/// store adapter: InMemory (default), Redis, or custom.
///
/// **IMPORTANT:** All methods use `&self` instead of `&mut self` to allow
/// concurrent access. Backend implementations should use interior mutability
/// (DashMap, connection pool, or external storage).
///
/// Object-safe by design: the store adapter owns a single
/// `Arc<dyn CacheBackend>` injected at process startup, so production Redis
/// and an in-memory fake are interchangeable in tests.
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    /// Retrieve value from cache by key.
    ///
    /// # Returns
    /// - `Ok(Some(bytes))` - Value found in cache
    /// - `Ok(None)` - Cache miss (key not found or expired)
    ///
    /// # Errors
    /// Returns `Err` if a backend error occurs (connection lost, etc.)
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store value in cache with optional TTL.
    ///
    /// # Arguments
    /// - `key`: Cache key
    /// - `value`: Serialized envelope bytes
    /// - `ttl`: Time-to-live. None = no expiry
    ///
    /// # Errors
    /// Returns `Err` if a backend error occurs
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;

    /// Remove value from cache. Deleting an absent key is success.
    ///
    /// # Errors
    /// Returns `Err` if a backend error occurs
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every key matching a `*`-wildcard pattern.
    ///
    /// Returns the number of keys removed. A pattern matching zero keys is
    /// success, not an error - invalidation is idempotent.
    ///
    /// # Errors
    /// Returns `Err` if a backend error occurs
    async fn delete_pattern(&self, pattern: &str) -> Result<u64>;

    /// Check if key exists in cache (optional optimization).
    ///
    /// # Errors
    /// Returns `Err` if a backend error occurs
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Collect storage statistics. Health surface only.
    ///
    /// # Errors
    /// Returns `Err` if a backend error occurs
    async fn stats(&self) -> Result<StoreStats>;

    /// Health check - verify backend is accessible.
    ///
    /// # Errors
    /// Returns `Err` if the backend is not accessible
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    /// Optional: Clear all cache (use with caution).
    ///
    /// # Errors
    /// Returns `Err` if the operation is not implemented or fails
    async fn clear_all(&self) -> Result<()> {
        Err(crate::error::Error::NotImplemented(
            "clear_all not implemented for this backend".to_string(),
        ))
    }
}

/// Match a key against a glob pattern supporting `*` wildcards.
///
/// Only `*` is recognized (matching zero or more characters); that is the
/// full vocabulary the invalidation registry uses. Every other character
/// matches literally.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let p = pattern.as_bytes();
    let k = key.as_bytes();
    let (mut pi, mut ki) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut mark = 0usize;

    while ki < k.len() {
        if pi < p.len() && p[pi] == b'*' {
            star = Some(pi);
            mark = ki;
            pi += 1;
        } else if pi < p.len() && p[pi] == k[ki] {
            pi += 1;
            ki += 1;
        } else if let Some(s) = star {
            // Backtrack: let the last `*` consume one more character
            pi = s + 1;
            mark += 1;
            ki = mark;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == b'*' {
        pi += 1;
    }
    pi == p.len()
}
