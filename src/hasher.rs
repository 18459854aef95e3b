//! Content identifier derivation
//!
//! The cache is keyed by a [`ContentIdentifier`]: an opaque string that
//! names one (input, transformation) pair. Identifiers are derived from
//! payload content so that identical submissions deduplicate, or supplied
//! by the caller, who then asserts uniqueness (the cache trusts supplied
//! identifiers verbatim and never verifies them against the bytes).

use sha2::{Digest, Sha256};

/// Opaque cache key naming one (input, transformation) pair
pub type ContentIdentifier = String;

/// Derive a stable identifier from payload content
///
/// SHA-256 hex digest of the bytes; deterministic, so repeated submissions
/// of the same payload resolve to the same cache entry.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> ContentIdentifier {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Synthesize a random identifier
///
/// Degenerate fallback for callers that must mint an identifier before the
/// payload exists. A random identifier never matches a prior entry, so it
/// defeats deduplication entirely; prefer [`content_hash`] or a
/// caller-managed identifier wherever possible.
#[must_use]
pub fn random_identifier() -> ContentIdentifier {
    uuid::Uuid::new_v4().to_string()
}

/// Resolve the identifier for one processing request
///
/// Caller-supplied identifiers win; otherwise the identifier is derived
/// from the payload content.
#[must_use]
pub fn resolve_identifier(bytes: &[u8], supplied: Option<&str>) -> ContentIdentifier {
    match supplied {
        Some(id) => id.to_string(),
        None => content_hash(bytes),
    }
}
