//! Cache store adapter - the single choke point between the application and
//! the physical cache store.
//!
//! Every caller goes through [`CacheStore`]; nothing else in the process may
//! talk to the backend directly. The adapter absorbs connectivity failures so
//! callers never have to distinguish "not cached" from "cache unavailable":
//! reads degrade to misses and writes to no-ops, and the request path is
//! never blocked or faulted by a cache outage.
//!
//! The adapter tracks a connected flag, updated by [`CacheStore::connect`],
//! [`CacheStore::disconnect`], operation failures and health probes, and
//! consults it before every operation to avoid issuing doomed calls. The flag
//! may flip between check and use; a failed operation immediately after a
//! successful check is a normal, handled failure.

use crate::backend::{CacheBackend, StoreStats};
use crate::error::{Error, Result};
use crate::invalidation::EntityGroup;
use crate::observability::{CacheMetrics, NoOpMetrics};
use crate::serialization;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared handle over the single injected backend instance.
///
/// `Clone` is cheap (Arc increments); one store is created at process startup
/// and passed by handle to every middleware.
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    connected: Arc<AtomicBool>,
    metrics: Arc<dyn CacheMetrics>,
    connect_timeout: Duration,
    command_timeout: Duration,
    max_retries: u32,
}

impl CacheStore {
    /// Create a store over the given backend.
    ///
    /// The store starts optimistically connected; call [`connect`] during
    /// startup to probe the backend and enter degraded mode if it is
    /// unreachable.
    ///
    /// [`connect`]: CacheStore::connect
    pub fn new(backend: impl CacheBackend + 'static) -> Self {
        CacheStore {
            backend: Arc::new(backend),
            connected: Arc::new(AtomicBool::new(true)),
            metrics: Arc::new(NoOpMetrics),
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(2),
            max_retries: 3,
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = Arc::from(metrics);
        self
    }

    /// Override the connect-probe timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Override the per-command timeout applied to every backend round-trip.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Override the connect retry cap.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Probe the backend with bounded timeouts and a capped retry count.
    ///
    /// Returns `true` once the backend answers a health check. On exhausted
    /// retries the store enters degraded mode, where all subsequent
    /// operations are safe no-ops. Never returns an error.
    pub async fn connect(&self) -> bool {
        let max_attempts = self.max_retries + 1;

        for attempt in 1..=max_attempts {
            match tokio::time::timeout(self.connect_timeout, self.backend.health_check()).await {
                Ok(Ok(true)) => {
                    self.connected.store(true, Ordering::SeqCst);
                    info!("✓ Cache store connected (attempt {})", attempt);
                    return true;
                }
                Ok(Ok(false)) => {
                    debug!("Cache store probe declined (attempt {})", attempt);
                }
                Ok(Err(e)) => {
                    debug!("Cache store probe failed (attempt {}): {}", attempt, e);
                }
                Err(_) => {
                    debug!("Cache store probe timed out (attempt {})", attempt);
                }
            }

            if attempt < max_attempts {
                // Exponential backoff
                let delay = Duration::from_millis(100 * 2_u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
            }
        }

        self.connected.store(false, Ordering::SeqCst);
        warn!(
            "⚠ Cache store unreachable after {} attempts - entering degraded mode",
            max_attempts
        );
        false
    }

    /// Flip the store into degraded mode; subsequent operations no-op.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        info!("Cache store disconnected");
    }

    /// Current connectivity flag. May flip at any time between check and use.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Retrieve and deserialize a cached value.
    ///
    /// Absent, expired, corrupt, timed-out and degraded all collapse to
    /// `None`. A corrupt entry is evicted so it cannot shadow future writes.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.is_connected() {
            debug!("Cache degraded - GET {} skipped", key);
            return None;
        }

        let timer = Instant::now();
        match self.guarded(self.backend.get(key)).await {
            Ok(Some(bytes)) => match serialization::deserialize_from_cache::<T>(&bytes) {
                Ok(value) => {
                    self.metrics.record_hit(key, timer.elapsed());
                    Some(value)
                }
                Err(e) => {
                    warn!("✗ Corrupt cache entry for {}: {} - evicting", key, e);
                    let _ = self.backend.delete(key).await;
                    self.metrics.record_miss(key, timer.elapsed());
                    None
                }
            },
            Ok(None) => {
                self.metrics.record_miss(key, timer.elapsed());
                None
            }
            Err(e) => {
                self.note_failure(key, &e);
                None
            }
        }
    }

    /// Serialize and store a value with expiry.
    ///
    /// Returns `false` on any failure; failures are logged, never raised.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        if !self.is_connected() {
            debug!("Cache degraded - SET {} skipped", key);
            return false;
        }

        let bytes = match serialization::serialize_for_cache(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.metrics.record_error(key, &e.to_string());
                return false;
            }
        };

        let timer = Instant::now();
        match self.guarded(self.backend.set(key, bytes, Some(ttl))).await {
            Ok(()) => {
                self.metrics.record_set(key, timer.elapsed());
                true
            }
            Err(e) => {
                self.note_failure(key, &e);
                false
            }
        }
    }

    /// Remove a single key. Idempotent; deleting an absent key is success.
    pub async fn delete(&self, key: &str) -> bool {
        if !self.is_connected() {
            debug!("Cache degraded - DELETE {} skipped", key);
            return false;
        }

        let timer = Instant::now();
        match self.guarded(self.backend.delete(key)).await {
            Ok(()) => {
                self.metrics.record_delete(key, timer.elapsed());
                true
            }
            Err(e) => {
                self.note_failure(key, &e);
                false
            }
        }
    }

    /// Delete every key matching a `*`-wildcard pattern.
    ///
    /// Returns the number of keys removed; zero matches is a valid outcome,
    /// and so is a degraded no-op.
    pub async fn delete_pattern(&self, pattern: &str) -> u64 {
        if !self.is_connected() {
            debug!("Cache degraded - DELETE_PATTERN {} skipped", pattern);
            return 0;
        }

        let timer = Instant::now();
        match self.guarded(self.backend.delete_pattern(pattern)).await {
            Ok(removed) => {
                self.metrics.record_delete(pattern, timer.elapsed());
                removed
            }
            Err(e) => {
                self.note_failure(pattern, &e);
                0
            }
        }
    }

    /// Invalidate every namespace registered for a mutated entity group,
    /// optionally narrowed by a scope hint (department / subcity id).
    ///
    /// Each pattern is attempted independently; one failure does not prevent
    /// the others. Returns the total number of keys removed.
    pub async fn invalidate_group(&self, group: EntityGroup, scope: Option<&str>) -> u64 {
        let mut removed = 0u64;
        for pattern in group.patterns(scope) {
            removed += self.delete_pattern(&pattern).await;
        }
        info!(
            "✓ Invalidated {} cached keys after {} mutation",
            removed, group
        );
        removed
    }

    /// Check key presence. Introspection only - never on the request path.
    pub async fn exists(&self, key: &str) -> bool {
        if !self.is_connected() {
            return false;
        }
        self.guarded(self.backend.exists(key)).await.unwrap_or(false)
    }

    /// Collect raw backend statistics. Introspection only.
    ///
    /// # Errors
    /// Returns `Err` when the backend is degraded or the collection fails;
    /// the health surface reports that as data.
    pub async fn stats(&self) -> Result<StoreStats> {
        if !self.is_connected() {
            return Err(Error::BackendError("cache store is degraded".to_string()));
        }
        self.guarded(self.backend.stats()).await
    }

    /// Probe the backend once and refresh the connected flag.
    ///
    /// This is the recovery path out of degraded mode: a successful probe
    /// restores normal operation.
    pub async fn probe(&self) -> bool {
        let healthy =
            match tokio::time::timeout(self.connect_timeout, self.backend.health_check()).await {
                Ok(Ok(ok)) => ok,
                Ok(Err(e)) => {
                    debug!("Cache store probe failed: {}", e);
                    false
                }
                Err(_) => {
                    debug!("Cache store probe timed out");
                    false
                }
            };

        self.connected.store(healthy, Ordering::SeqCst);
        healthy
    }

    /// Shared backend handle, for admin operations outside this contract
    /// (e.g. a gated full flush).
    pub fn backend(&self) -> Arc<dyn CacheBackend> {
        Arc::clone(&self.backend)
    }

    /// Wrap a backend round-trip in the command timeout.
    async fn guarded<T>(
        &self,
        op: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.command_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "cache command exceeded {:?}",
                self.command_timeout
            ))),
        }
    }

    /// Record a failed operation and flip into degraded mode.
    fn note_failure(&self, key: &str, e: &Error) {
        self.connected.store(false, Ordering::SeqCst);
        warn!("✗ Cache operation failed for {}: {} - degrading", key, e);
        self.metrics.record_error(key, &e.to_string());
    }
}
