//! Static registry mapping mutated entity groups to the cache namespaces
//! that could now be stale.
//!
//! Statistics and dashboard are aggregate views derived from every other
//! entity, so every mutation type invalidates them. The mapping prefers
//! false-positive invalidation (slightly more recompute) over false-negative
//! staleness.

use std::fmt;

/// Namespaces summarizing every entity; cleared on any mutation.
const AGGREGATE_NAMESPACES: [&str; 2] = ["statistics", "dashboard"];

/// The entity groups whose write endpoints trigger invalidation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityGroup {
    Employee,
    Complaint,
    Rating,
    Feedback,
    Admin,
}

impl EntityGroup {
    /// The entity's own key namespace, if it has cached listings of its own.
    ///
    /// Admin mutations (org-structure edits, role changes) have no listing
    /// namespace of their own; only the aggregates go stale.
    pub fn own_namespace(self) -> Option<&'static str> {
        match self {
            EntityGroup::Employee => Some("employees"),
            EntityGroup::Complaint => Some("complaints"),
            EntityGroup::Rating => Some("ratings"),
            EntityGroup::Feedback => Some("feedback"),
            EntityGroup::Admin => None,
        }
    }

    /// Every namespace a successful mutation of this group invalidates.
    pub fn namespaces(self) -> Vec<&'static str> {
        let mut out = Vec::with_capacity(3);
        if let Some(ns) = self.own_namespace() {
            out.push(ns);
        }
        out.extend(AGGREGATE_NAMESPACES);
        out
    }

    /// Glob patterns covering this group's namespaces, optionally narrowed by
    /// a scope hint (a department or subcity identifier embedded in keys).
    pub fn patterns(self, scope: Option<&str>) -> Vec<String> {
        self.namespaces()
            .into_iter()
            .map(|ns| match scope {
                Some(hint) => format!("{}:*{}*", ns, hint),
                None => format!("{}:*", ns),
            })
            .collect()
    }
}

impl fmt::Display for EntityGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityGroup::Employee => "employee",
            EntityGroup::Complaint => "complaint",
            EntityGroup::Rating => "rating",
            EntityGroup::Feedback => "feedback",
            EntityGroup::Admin => "admin",
        };
        write!(f, "{}", name)
    }
}
