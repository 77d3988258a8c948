//! # civic-cache
//!
//! Response caching and invalidation layer for a municipal services backend.
//!
//! Citizens read complaint, rating and feedback data against an
//! organizational hierarchy; administrators mutate it. This crate wraps the
//! read endpoints in a cache-aside layer and the write endpoints in
//! pattern-based invalidation, over a swappable key-value backend.
//!
//! ## Features
//!
//! - **Cache-aside middleware:** GET responses served from cache, populated
//!   on miss via a detached write-back - the client never waits on the store
//! - **Actor-scoped keys:** `{namespace}:{role}:{id}:{path}:{query}` with a
//!   canonical query serialization; one actor's view never leaks to another
//! - **Pattern invalidation:** a successful mutation clears its entity's
//!   namespace plus the statistics/dashboard aggregates
//! - **Degraded mode:** a cache outage is invisible to callers - reads
//!   become misses, writes become no-ops, requests never fail
//! - **Backend agnostic:** in-memory (default) or Redis, behind one
//!   object-safe trait
//!
//! ## Quick Start
//!
//! ```ignore
//! use civic_cache::{
//!     backend::InMemoryBackend,
//!     middleware::{cache_response, invalidate_on_write, InvalidationState, ResponseCacheState},
//!     CacheProfile, CacheStore, EntityGroup,
//! };
//! use axum::{middleware, routing::{get, post}, Router};
//!
//! // One store per process, created at startup
//! let store = CacheStore::new(InMemoryBackend::new());
//! store.connect().await;
//!
//! let app = Router::new()
//!     .route("/api/complaints", get(list_complaints))
//!     .layer(middleware::from_fn_with_state(
//!         ResponseCacheState::new(store.clone(), CacheProfile::complaints()),
//!         cache_response,
//!     ))
//!     .route("/api/complaints", post(create_complaint))
//!     .layer(middleware::from_fn_with_state(
//!         InvalidationState::for_entity(store.clone(), EntityGroup::Complaint),
//!         invalidate_on_write,
//!     ));
//! ```
//!
//! For production, build the store from the environment with
//! [`CacheConfig::from_env`] and the `redis` feature.

#[macro_use]
extern crate log;

pub mod backend;
pub mod config;
pub mod error;
pub mod health;
pub mod invalidation;
pub mod key;
pub mod middleware;
pub mod observability;
pub mod profile;
pub mod serialization;
pub mod store;

// Re-exports for convenience
pub use backend::CacheBackend;
pub use config::CacheConfig;
pub use error::{Error, Result};
pub use health::{cache_health, CacheHealth};
pub use invalidation::EntityGroup;
pub use key::{response_key, ActorContext};
pub use middleware::{
    cache_response, invalidate_on_write, CachedResponse, InvalidationState, ResponseCacheState,
};
pub use profile::CacheProfile;
pub use store::CacheStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
