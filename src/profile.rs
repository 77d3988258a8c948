//! Named TTL/namespace pairs grouping cached routes by data volatility.

use std::time::Duration;

/// Per-route-group cache configuration: the key namespace and the TTL
/// applied to entries written under it.
///
/// The named constructors encode how fast each class of municipal data
/// goes stale; `new` covers custom route groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheProfile {
    pub namespace: &'static str,
    pub ttl: Duration,
}

impl CacheProfile {
    pub const fn new(namespace: &'static str, ttl: Duration) -> Self {
        CacheProfile { namespace, ttl }
    }

    /// Organizational listings - long-lived reference data.
    pub const fn employees() -> Self {
        Self::new("employees", Duration::from_secs(3600))
    }

    /// Complaint listings and detail views.
    pub const fn complaints() -> Self {
        Self::new("complaints", Duration::from_secs(300))
    }

    /// Rating listings and summaries.
    pub const fn ratings() -> Self {
        Self::new("ratings", Duration::from_secs(300))
    }

    /// Feedback listings.
    pub const fn feedback() -> Self {
        Self::new("feedback", Duration::from_secs(300))
    }

    /// Aggregate statistics views.
    pub const fn statistics() -> Self {
        Self::new("statistics", Duration::from_secs(300))
    }

    /// Near-real-time dashboard data.
    pub const fn dashboard() -> Self {
        Self::new("dashboard", Duration::from_secs(60))
    }

    /// High-frequency search-style lookups.
    pub const fn search() -> Self {
        Self::new("search", Duration::from_secs(120))
    }
}
