//! Axum middleware: response caching for reads, pattern invalidation for
//! writes.

pub mod invalidate;
pub mod response_cache;

pub use invalidate::{invalidate_on_write, InvalidationState};
pub use response_cache::{cache_response, CachedResponse, ResponseCacheState};
