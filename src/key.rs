//! Cache key construction from request identity.
//!
//! A response-cache key is the confidentiality boundary of the whole layer:
//! two requests with identical namespace, actor, path and query parameters
//! must produce the identical key, and two requests differing in any of those
//! dimensions must never share one. Keys are built here and nowhere else.
//!
//! Format: `{namespace}:{role}:{id}:{path}:{canonical-query}`

/// Role recorded for requests with no authenticated actor.
pub const PUBLIC_ROLE: &str = "public";

/// Actor id recorded for requests with no authenticated actor.
pub const ANONYMOUS_ID: &str = "anonymous";

/// Read-only view of the authenticated principal, as issued by the auth
/// middleware into request extensions.
///
/// Anonymous requests use the shared [`ActorContext::public`] sentinel, so
/// public responses are cacheable across callers without ever colliding with
/// an authenticated actor's key space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActorContext {
    pub id: String,
    pub role: String,
}

impl ActorContext {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        ActorContext {
            id: id.into(),
            role: role.into(),
        }
    }

    /// The shared sentinel for unauthenticated requests.
    pub fn public() -> Self {
        ActorContext {
            id: ANONYMOUS_ID.to_string(),
            role: PUBLIC_ROLE.to_string(),
        }
    }

    pub fn is_public(&self) -> bool {
        self.role == PUBLIC_ROLE && self.id == ANONYMOUS_ID
    }
}

impl Default for ActorContext {
    fn default() -> Self {
        Self::public()
    }
}

/// Canonicalize a raw query string into a deterministic serialization.
///
/// Pairs are compared and re-joined after sorting by key, then value, so the
/// result is order-independent in content but byte-identical for identical
/// parameter sets. Pairs without `=` are kept with an empty value. No percent
/// decoding is performed: differently-encoded spellings of one logical
/// parameter land in separate entries, which fragments the hit rate but never
/// crosses an identity boundary.
pub fn canonical_query(raw: Option<&str>) -> String {
    let mut pairs: Vec<(&str, &str)> = raw
        .unwrap_or("")
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair, ""),
        })
        .collect();

    pairs.sort_unstable();

    let mut out = String::new();
    for (i, (k, v)) in pairs.iter().enumerate() {
        if i > 0 {
            out.push('&');
        }
        out.push_str(k);
        out.push('=');
        out.push_str(v);
    }
    out
}

/// Build the full response-cache key for a request.
///
/// `actor = None` resolves to the public/anonymous sentinel.
pub fn response_key(
    namespace: &str,
    actor: Option<&ActorContext>,
    path: &str,
    raw_query: Option<&str>,
) -> String {
    let sentinel;
    let actor = match actor {
        Some(a) => a,
        None => {
            sentinel = ActorContext::public();
            &sentinel
        }
    };

    format!(
        "{}:{}:{}:{}:{}",
        namespace,
        actor.role,
        actor.id,
        path,
        canonical_query(raw_query)
    )
}
