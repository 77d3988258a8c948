//! Integration tests for civic-cache
//!
//! These tests drive full axum routers through the cache and invalidation
//! middleware and verify the end-to-end contract: key scoping, miss/hit
//! flow, TTL expiry, invalidation fan-out and outage behavior.

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use civic_cache::backend::InMemoryBackend;
use civic_cache::middleware::{
    cache_response, invalidate_on_write, InvalidationState, ResponseCacheState,
};
use civic_cache::{ActorContext, CacheProfile, CacheStore, EntityGroup};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Router whose GET handler bumps a counter and echoes it, so a cache hit
/// (handler not invoked) is distinguishable from a recompute.
fn cached_router(
    store: &CacheStore,
    profile: CacheProfile,
    path: &str,
    counter: Arc<AtomicUsize>,
) -> Router {
    let handler = move || {
        let counter = counter.clone();
        async move {
            let serial = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Json(serde_json::json!({ "complaints": [], "serial": serial }))
        }
    };

    Router::new()
        .route(path, get(handler))
        .layer(from_fn_with_state(
            ResponseCacheState::new(store.clone(), profile),
            cache_response,
        ))
}

fn get_request(uri: &str, actor: Option<ActorContext>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(actor) = actor {
        builder = builder.extension(actor);
    }
    builder.body(Body::empty()).expect("request")
}

fn post_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn marker(response: &Response) -> String {
    response
        .headers()
        .get("x-cache")
        .map(|v| v.to_str().unwrap_or("").to_string())
        .unwrap_or_default()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body")
        .to_vec()
}

/// Let detached write-back/invalidation tasks run.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Test 1: Miss-then-hit
///
/// A fresh key is a miss (handler invoked, marker MISS); an immediate second
/// identical request is a hit (handler NOT invoked, marker HIT, identical
/// body).
#[tokio::test]
async fn test_miss_then_hit() {
    init_logs();
    let store = CacheStore::new(InMemoryBackend::new());
    let counter = Arc::new(AtomicUsize::new(0));
    let app = cached_router(
        &store,
        CacheProfile::complaints(),
        "/api/complaints",
        counter.clone(),
    );

    let first = app
        .clone()
        .oneshot(get_request("/api/complaints?status=open", None))
        .await
        .expect("first request");
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(marker(&first), "MISS");
    let first_body = body_bytes(first).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    settle().await;

    let second = app
        .clone()
        .oneshot(get_request("/api/complaints?status=open", None))
        .await
        .expect("second request");
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(marker(&second), "HIT");
    let second_body = body_bytes(second).await;

    // Handler was not invoked again, body identical to the first response
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(first_body, second_body);
}

/// Test 2: Determinism across query parameter order
///
/// Logically identical requests with reordered parameters share one entry.
#[tokio::test]
async fn test_param_order_shares_entry() {
    let store = CacheStore::new(InMemoryBackend::new());
    let counter = Arc::new(AtomicUsize::new(0));
    let app = cached_router(
        &store,
        CacheProfile::search(),
        "/api/search",
        counter.clone(),
    );

    let first = app
        .clone()
        .oneshot(get_request("/api/search?q=pothole&page=2", None))
        .await
        .expect("first request");
    assert_eq!(marker(&first), "MISS");
    settle().await;

    let second = app
        .clone()
        .oneshot(get_request("/api/search?page=2&q=pothole", None))
        .await
        .expect("second request");
    assert_eq!(marker(&second), "HIT");
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

/// Test 3: Actor isolation
///
/// Two authenticated actors hitting the same path+query never share an
/// entry, and neither shares with anonymous callers.
#[tokio::test]
async fn test_actor_isolation() {
    let store = CacheStore::new(InMemoryBackend::new());
    let counter = Arc::new(AtomicUsize::new(0));
    let app = cached_router(
        &store,
        CacheProfile::employees(),
        "/api/employees",
        counter.clone(),
    );

    let admin = ActorContext::new("42", "admin");
    let staff = ActorContext::new("7", "staff");

    let r1 = app
        .clone()
        .oneshot(get_request("/api/employees", Some(admin.clone())))
        .await
        .expect("admin request");
    assert_eq!(marker(&r1), "MISS");
    settle().await;

    // Same path+query, different actor: fresh miss
    let r2 = app
        .clone()
        .oneshot(get_request("/api/employees", Some(staff)))
        .await
        .expect("staff request");
    assert_eq!(marker(&r2), "MISS");
    settle().await;

    // Anonymous caller: fresh miss again
    let r3 = app
        .clone()
        .oneshot(get_request("/api/employees", None))
        .await
        .expect("anonymous request");
    assert_eq!(marker(&r3), "MISS");
    settle().await;

    // The original admin entry is still live
    let r4 = app
        .clone()
        .oneshot(get_request("/api/employees", Some(admin)))
        .await
        .expect("admin again");
    assert_eq!(marker(&r4), "HIT");

    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

/// Test 4: TTL expiry
///
/// An entry is a hit before its TTL elapses and a miss after.
#[tokio::test]
async fn test_ttl_expiry() {
    let store = CacheStore::new(InMemoryBackend::new());
    let counter = Arc::new(AtomicUsize::new(0));
    let app = cached_router(
        &store,
        CacheProfile::new("dashboard", Duration::from_millis(150)),
        "/dashboard",
        counter.clone(),
    );

    let first = app
        .clone()
        .oneshot(get_request("/dashboard", None))
        .await
        .expect("first request");
    assert_eq!(marker(&first), "MISS");
    settle().await;

    let second = app
        .clone()
        .oneshot(get_request("/dashboard", None))
        .await
        .expect("second request");
    assert_eq!(marker(&second), "HIT");

    tokio::time::sleep(Duration::from_millis(200)).await;

    let third = app
        .clone()
        .oneshot(get_request("/dashboard", None))
        .await
        .expect("third request");
    assert_eq!(marker(&third), "MISS");
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

/// Test 5: Write-only bypass
///
/// A non-GET request to a cached route neither consults the cache nor
/// produces a write, regardless of prior cached GETs on the same path.
#[tokio::test]
async fn test_write_bypasses_cache() {
    let store = CacheStore::new(InMemoryBackend::new());
    let get_counter = Arc::new(AtomicUsize::new(0));
    let post_counter = Arc::new(AtomicUsize::new(0));

    let get_handler = {
        let counter = get_counter.clone();
        move || {
            let counter = counter.clone();
            async move {
                let serial = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Json(serde_json::json!({ "feedback": [], "serial": serial }))
            }
        }
    };

    let post_handler = {
        let counter = post_counter.clone();
        move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                StatusCode::CREATED
            }
        }
    };

    let app = Router::new()
        .route("/api/feedback", get(get_handler).post(post_handler))
        .layer(from_fn_with_state(
            ResponseCacheState::new(store.clone(), CacheProfile::feedback()),
            cache_response,
        ));

    // Warm the GET entry
    let warm = app
        .clone()
        .oneshot(get_request("/api/feedback", None))
        .await
        .expect("warm request");
    assert_eq!(marker(&warm), "MISS");
    settle().await;

    // POST passes through untouched: no marker, handler invoked each time
    for _ in 0..2 {
        let write = app
            .clone()
            .oneshot(post_request("/api/feedback"))
            .await
            .expect("write request");
        assert_eq!(write.status(), StatusCode::CREATED);
        assert!(write.headers().get("x-cache").is_none());
    }
    assert_eq!(post_counter.load(Ordering::SeqCst), 2);

    // The cached GET is still served without another handler run
    let read = app
        .clone()
        .oneshot(get_request("/api/feedback", None))
        .await
        .expect("read request");
    assert_eq!(marker(&read), "HIT");
    assert_eq!(get_counter.load(Ordering::SeqCst), 1);
}

/// Test 6: Invalidation fan-out
///
/// A successful employee mutation clears employees/statistics/dashboard
/// entries; unrelated ratings entries stay hits.
#[tokio::test]
async fn test_invalidation_fanout() {
    let store = CacheStore::new(InMemoryBackend::new());

    let employees = cached_router(
        &store,
        CacheProfile::employees(),
        "/api/employees",
        Arc::new(AtomicUsize::new(0)),
    );
    let statistics = cached_router(
        &store,
        CacheProfile::statistics(),
        "/api/statistics",
        Arc::new(AtomicUsize::new(0)),
    );
    let dashboard = cached_router(
        &store,
        CacheProfile::dashboard(),
        "/dashboard",
        Arc::new(AtomicUsize::new(0)),
    );
    let ratings = cached_router(
        &store,
        CacheProfile::ratings(),
        "/api/ratings",
        Arc::new(AtomicUsize::new(0)),
    );

    let writes = Router::new()
        .route("/api/employees", post(|| async { StatusCode::CREATED }))
        .layer(from_fn_with_state(
            InvalidationState::for_entity(store.clone(), EntityGroup::Employee),
            invalidate_on_write,
        ));

    // Warm all four namespaces
    for (app, uri) in [
        (&employees, "/api/employees"),
        (&statistics, "/api/statistics"),
        (&dashboard, "/dashboard"),
        (&ratings, "/api/ratings"),
    ] {
        let r = app
            .clone()
            .oneshot(get_request(uri, None))
            .await
            .expect("warm request");
        assert_eq!(marker(&r), "MISS");
    }
    settle().await;

    // Mutate employees
    let write = writes
        .clone()
        .oneshot(post_request("/api/employees"))
        .await
        .expect("write request");
    assert_eq!(write.status(), StatusCode::CREATED);
    settle().await;

    // Invalidated namespaces recompute
    for (app, uri) in [
        (&employees, "/api/employees"),
        (&statistics, "/api/statistics"),
        (&dashboard, "/dashboard"),
    ] {
        let r = app
            .clone()
            .oneshot(get_request(uri, None))
            .await
            .expect("request after write");
        assert_eq!(marker(&r), "MISS", "{} should have been invalidated", uri);
    }

    // Unrelated namespace unaffected
    let r = ratings
        .clone()
        .oneshot(get_request("/api/ratings", None))
        .await
        .expect("ratings request");
    assert_eq!(marker(&r), "HIT");
}

/// Test 7: Failed writes do not invalidate
///
/// A non-2xx mutation leaves every cached entry in place.
#[tokio::test]
async fn test_failed_write_does_not_invalidate() {
    let store = CacheStore::new(InMemoryBackend::new());
    let complaints = cached_router(
        &store,
        CacheProfile::complaints(),
        "/api/complaints",
        Arc::new(AtomicUsize::new(0)),
    );

    let writes = Router::new()
        .route(
            "/api/complaints",
            post(|| async { StatusCode::UNPROCESSABLE_ENTITY }),
        )
        .layer(from_fn_with_state(
            InvalidationState::for_entity(store.clone(), EntityGroup::Complaint),
            invalidate_on_write,
        ));

    let warm = complaints
        .clone()
        .oneshot(get_request("/api/complaints", None))
        .await
        .expect("warm request");
    assert_eq!(marker(&warm), "MISS");
    settle().await;

    let write = writes
        .clone()
        .oneshot(post_request("/api/complaints"))
        .await
        .expect("write request");
    assert_eq!(write.status(), StatusCode::UNPROCESSABLE_ENTITY);
    settle().await;

    let read = complaints
        .clone()
        .oneshot(get_request("/api/complaints", None))
        .await
        .expect("read request");
    assert_eq!(marker(&read), "HIT");
}

/// Test 8: Idempotent invalidation
///
/// Invalidating patterns that match nothing succeeds and leaves unrelated
/// keys alone.
#[tokio::test]
async fn test_idempotent_invalidation() {
    let store = CacheStore::new(InMemoryBackend::new());
    let ratings = cached_router(
        &store,
        CacheProfile::ratings(),
        "/api/ratings",
        Arc::new(AtomicUsize::new(0)),
    );

    let warm = ratings
        .clone()
        .oneshot(get_request("/api/ratings", None))
        .await
        .expect("warm request");
    assert_eq!(marker(&warm), "MISS");
    settle().await;

    // Nothing cached under feedback/statistics/dashboard: still success
    let removed = store.invalidate_group(EntityGroup::Feedback, None).await;
    assert_eq!(removed, 0);

    let read = ratings
        .clone()
        .oneshot(get_request("/api/ratings", None))
        .await
        .expect("read request");
    assert_eq!(marker(&read), "HIT");
}

/// Test 9: Outage resilience
///
/// With the store forcibly disconnected, cached routes still return correct
/// recomputed responses with status 200, marker MISS, and no errors.
#[tokio::test]
async fn test_outage_resilience() {
    init_logs();
    let store = CacheStore::new(InMemoryBackend::new());
    let counter = Arc::new(AtomicUsize::new(0));
    let app = cached_router(
        &store,
        CacheProfile::statistics(),
        "/api/statistics",
        counter.clone(),
    );

    // Warm the cache, then lose the store
    let warm = app
        .clone()
        .oneshot(get_request("/api/statistics", None))
        .await
        .expect("warm request");
    assert_eq!(marker(&warm), "MISS");
    settle().await;

    store.disconnect();

    for _ in 0..2 {
        let r = app
            .clone()
            .oneshot(get_request("/api/statistics", None))
            .await
            .expect("request during outage");
        assert_eq!(r.status(), StatusCode::OK);
        assert_eq!(marker(&r), "MISS");
    }

    // Every outage request recomputed
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

/// Test 10: Failed responses are not cached
///
/// A handler returning non-2xx never produces a subsequent hit.
#[tokio::test]
async fn test_failed_response_not_cached() {
    let store = CacheStore::new(InMemoryBackend::new());
    let counter = Arc::new(AtomicUsize::new(0));

    let handler = {
        let counter = counter.clone();
        move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (StatusCode::INTERNAL_SERVER_ERROR, "backend exploded").into_response()
            }
        }
    };

    let app = Router::new()
        .route("/api/complaints", get(handler))
        .layer(from_fn_with_state(
            ResponseCacheState::new(store.clone(), CacheProfile::complaints()),
            cache_response,
        ));

    for _ in 0..2 {
        let r = app
            .clone()
            .oneshot(get_request("/api/complaints", None))
            .await
            .expect("request");
        assert_eq!(r.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(marker(&r), "MISS");
        settle().await;
    }

    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

/// Test 11: Diagnostic key header
///
/// Cached-route responses expose the computed key for debugging.
#[tokio::test]
async fn test_cache_key_header() {
    let store = CacheStore::new(InMemoryBackend::new());
    let app = cached_router(
        &store,
        CacheProfile::dashboard(),
        "/dashboard",
        Arc::new(AtomicUsize::new(0)),
    );

    let r = app
        .clone()
        .oneshot(get_request("/dashboard?widget=open-complaints", None))
        .await
        .expect("request");

    let key = r
        .headers()
        .get("x-cache-key")
        .expect("key header")
        .to_str()
        .expect("ascii key");
    assert_eq!(
        key,
        "dashboard:public:anonymous:/dashboard:widget=open-complaints"
    );
}

/// Test 12: Health endpoint over a live store
#[tokio::test]
async fn test_health_endpoint() {
    let store = CacheStore::new(InMemoryBackend::new());
    store
        .set("statistics:public:anonymous:/api/statistics:", &1u32, Duration::from_secs(60))
        .await;

    let app = Router::new()
        .route("/admin/cache/health", get(civic_cache::cache_health))
        .with_state(store.clone());

    let r = app
        .oneshot(get_request("/admin/cache/health", None))
        .await
        .expect("health request");
    assert_eq!(r.status(), StatusCode::OK);

    let body = body_bytes(r).await;
    let health: serde_json::Value = serde_json::from_slice(&body).expect("health json");
    assert_eq!(health["connected"], true);
    assert_eq!(health["stats"]["total_entries"], 1);
}
