//! Operational health surface for the cache layer.
//!
//! Read-only introspection for monitoring; never consumed by business logic
//! and never on the request hot path. Collecting health must not fail: any
//! error gathering stats is itself reported as data.

use crate::backend::StoreStats;
use crate::store::CacheStore;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Snapshot of cache connectivity and storage statistics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheHealth {
    /// Whether the backend answered the probe.
    pub connected: bool,
    /// Raw store statistics, when the backend is reachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StoreStats>,
    /// Failure description, when it is not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Unix timestamp (seconds) of the snapshot.
    pub checked_at: u64,
}

impl CacheStore {
    /// Probe the backend, refresh the connected flag and collect statistics.
    ///
    /// Never returns an error; an unreachable store or failed stats
    /// collection shows up in the `connected`/`error` fields.
    pub async fn health(&self) -> CacheHealth {
        let checked_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        if !self.probe().await {
            return CacheHealth {
                connected: false,
                stats: None,
                error: Some("cache store unreachable".to_string()),
                checked_at,
            };
        }

        match self.stats().await {
            Ok(stats) => CacheHealth {
                connected: true,
                stats: Some(stats),
                error: None,
                checked_at,
            },
            Err(e) => CacheHealth {
                connected: true,
                stats: None,
                error: Some(e.to_string()),
                checked_at,
            },
        }
    }
}

/// Axum handler exposing [`CacheHealth`] as JSON.
///
/// Mount under an admin-gated router:
///
/// ```ignore
/// let admin = Router::new()
///     .route("/cache/health", get(cache_health))
///     .with_state(store.clone());
/// ```
pub async fn cache_health(State(store): State<CacheStore>) -> Json<CacheHealth> {
    Json(store.health().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use std::time::Duration;

    #[tokio::test]
    async fn test_health_reports_connected_with_stats() {
        let store = CacheStore::new(InMemoryBackend::new());
        store
            .set("dashboard:public:anonymous:/dashboard:", &42u32, Duration::from_secs(60))
            .await;

        let health = store.health().await;
        assert!(health.connected);
        assert!(health.error.is_none());
        let stats = health.stats.expect("stats expected when connected");
        assert_eq!(stats.total_entries, 1);
        assert!(health.checked_at > 0);
    }

    #[tokio::test]
    async fn test_health_recovers_degraded_inmemory_store() {
        // The in-memory backend always answers the probe, so a manually
        // disconnected store comes back connected.
        let store = CacheStore::new(InMemoryBackend::new());
        store.disconnect();

        let health = store.health().await;
        assert!(health.connected);
        assert!(store.is_connected());
    }

    #[tokio::test]
    async fn test_health_serializes_without_stats_field_when_down() {
        let health = CacheHealth {
            connected: false,
            stats: None,
            error: Some("cache store unreachable".to_string()),
            checked_at: 1,
        };
        let json = serde_json::to_string(&health).expect("serialize");
        assert!(!json.contains("stats"));
        assert!(json.contains("unreachable"));
    }
}
