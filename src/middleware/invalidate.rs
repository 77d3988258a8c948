//! Invalidation middleware: after a successful mutation, delete exactly the
//! cache regions that could now be stale.
//!
//! Wraps write routes. Once the downstream handler has produced a successful
//! (2xx) response, every configured pattern is deleted in a detached task -
//! each pattern independently, per-pattern failures logged and swallowed.
//! Invalidation failure never fails the triggering write, and never adds
//! latency to the response path.

use crate::invalidation::EntityGroup;
use crate::store::CacheStore;
use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use futures::future::join_all;
use std::sync::Arc;

/// Middleware state: the shared store handle plus the glob patterns to clear.
#[derive(Clone)]
pub struct InvalidationState {
    store: CacheStore,
    patterns: Arc<Vec<String>>,
}

impl InvalidationState {
    /// Construct from an explicit pattern list.
    pub fn new(store: CacheStore, patterns: Vec<String>) -> Self {
        InvalidationState {
            store,
            patterns: Arc::new(patterns),
        }
    }

    /// Construct from the registered pattern set for an entity group.
    pub fn for_entity(store: CacheStore, group: EntityGroup) -> Self {
        Self::new(store, group.patterns(None))
    }

    /// Like [`for_entity`], narrowed by a scope hint (department / subcity
    /// identifier embedded in keys).
    ///
    /// [`for_entity`]: InvalidationState::for_entity
    pub fn for_entity_scoped(store: CacheStore, group: EntityGroup, scope: &str) -> Self {
        Self::new(store, group.patterns(Some(scope)))
    }

    /// The configured patterns, for wiring assertions in tests.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// The invalidation middleware function.
///
/// Mount with `axum::middleware::from_fn_with_state` on write routes:
///
/// ```ignore
/// let complaints = Router::new()
///     .route("/api/complaints", post(create_complaint))
///     .layer(middleware::from_fn_with_state(
///         InvalidationState::for_entity(store.clone(), EntityGroup::Complaint),
///         invalidate_on_write,
///     ));
/// ```
pub async fn invalidate_on_write(
    State(state): State<InvalidationState>,
    request: Request,
    next: Next,
) -> Response {
    // Reads never trigger invalidation, even when a route group mounts this
    // layer over mixed verbs.
    let mutating = !matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    );

    let response = next.run(request).await;

    if mutating && response.status().is_success() {
        let store = state.store.clone();
        let patterns = Arc::clone(&state.patterns);
        tokio::spawn(async move {
            // Each pattern fires independently; one failure never prevents
            // the others from being attempted.
            join_all(patterns.iter().map(|pattern| {
                let store = store.clone();
                async move {
                    let removed = store.delete_pattern(pattern).await;
                    debug!("✓ Invalidated {} keys matching {}", removed, pattern);
                }
            }))
            .await;
        });
    }

    response
}
