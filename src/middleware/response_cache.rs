//! Response-cache middleware: transparently serve cached GET responses and
//! populate the cache on miss.
//!
//! One instance wraps one route group, parameterized by a [`CacheProfile`]
//! (namespace + TTL). The flow per request:
//!
//! 1. Non-GET verbs pass through untouched - caching never applies to
//!    mutating requests.
//! 2. The cache key is derived from the profile namespace, the authenticated
//!    actor in request extensions (or the public/anonymous sentinel), the
//!    request path and the canonicalized query string.
//! 3. Hit: the cached payload is emitted directly and the downstream handler
//!    is never invoked.
//! 4. Miss: the downstream handler runs; a successful (2xx) response is
//!    buffered and written back in a detached task, so the store round-trip
//!    never delays the client-visible response.
//!
//! Every response carries an `x-cache` marker (`HIT`/`MISS`) and the
//! computed `x-cache-key` for debugging.
//!
//! Non-guarantee: there is no single-flight coalescing. Concurrent misses
//! for the same key may each run the downstream handler and each write back
//! (last-write-wins); the underlying data source stays authoritative and a
//! cache entry is always re-derivable.
//!
//! Routes whose response depends on request context beyond path and query
//! (per-IP variations, time-of-request randomness) must not be mounted
//! behind this middleware: anonymous callers share one sentinel key space.

use crate::key::{response_key, ActorContext};
use crate::profile::CacheProfile;
use crate::store::CacheStore;
use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use serde::{Deserialize, Serialize};

/// Diagnostic marker header: `HIT` or `MISS`.
pub const CACHE_MARKER_HEADER: &str = "x-cache";

/// Diagnostic header carrying the computed cache key.
pub const CACHE_KEY_HEADER: &str = "x-cache-key";

/// The stored shape of a cached endpoint response.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl CachedResponse {
    /// Rebuild an HTTP response from the cached envelope.
    fn into_response(self, key: &str) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);

        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = status;

        if let Some(ct) = self.content_type.as_deref() {
            if let Ok(value) = HeaderValue::from_str(ct) {
                response.headers_mut().insert(header::CONTENT_TYPE, value);
            }
        }

        set_diagnostics(response.headers_mut(), key, "HIT");
        response
    }
}

/// Per-route-group middleware state: the shared store handle plus the
/// namespace/TTL profile for this group.
#[derive(Clone)]
pub struct ResponseCacheState {
    pub store: CacheStore,
    pub profile: CacheProfile,
}

impl ResponseCacheState {
    pub fn new(store: CacheStore, profile: CacheProfile) -> Self {
        ResponseCacheState { store, profile }
    }
}

/// The response-cache middleware function.
///
/// Mount with `axum::middleware::from_fn_with_state`:
///
/// ```ignore
/// let complaints = Router::new()
///     .route("/api/complaints", get(list_complaints))
///     .layer(middleware::from_fn_with_state(
///         ResponseCacheState::new(store.clone(), CacheProfile::complaints()),
///         cache_response,
///     ));
/// ```
pub async fn cache_response(
    State(state): State<ResponseCacheState>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let actor = request.extensions().get::<ActorContext>().cloned();
    let key = response_key(
        state.profile.namespace,
        actor.as_ref(),
        request.uri().path(),
        request.uri().query(),
    );

    if let Some(cached) = state.store.get::<CachedResponse>(&key).await {
        debug!("✓ Response cache HIT {}", key);
        return cached.into_response(&key);
    }

    let response = next.run(request).await;
    let (mut parts, body) = response.into_parts();
    set_diagnostics(&mut parts.headers, &key, "MISS");

    // Only successful responses are cached
    if !parts.status.is_success() {
        return Response::from_parts(parts, body);
    }

    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("✗ Failed to buffer response body for {}: {}", key, e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        content_type: parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        body: bytes.to_vec(),
    };

    // Detached write-back: the client response is already complete and must
    // not wait on the store round-trip.
    let store = state.store.clone();
    let ttl = state.profile.ttl;
    let write_key = key.clone();
    tokio::spawn(async move {
        if !store.set(&write_key, &cached, ttl).await {
            debug!("Response cache write-back skipped for {}", write_key);
        }
    });

    Response::from_parts(parts, Body::from(bytes))
}

fn set_diagnostics(headers: &mut HeaderMap, key: &str, marker: &'static str) {
    headers.insert(CACHE_MARKER_HEADER, HeaderValue::from_static(marker));
    // A key is request-derived text; skip the header rather than fail if it
    // is not a valid header value.
    if let Ok(value) = HeaderValue::from_str(key) {
        headers.insert(CACHE_KEY_HEADER, value);
    }
}
