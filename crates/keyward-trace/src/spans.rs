//! Span creation for resolution operations.

use keyward_core::KeyHash;
use tracing::{Level, Span, span};

/// Create a span for a full `get_secret` call.
pub fn resolve_span(key_hash: &KeyHash) -> Span {
    span!(Level::DEBUG, "secret.resolve", secret.key_hash = %key_hash)
}

/// Create a span for a single provider lookup.
pub fn provider_span(key_hash: &KeyHash, provider: &str, depth: usize) -> Span {
    span!(
        Level::DEBUG,
        "secret.provider",
        secret.key_hash = %key_hash,
        provider = provider,
        depth = depth,
    )
}

/// Create a span for cache maintenance operations.
pub fn cache_span(operation: &str) -> Span {
    span!(Level::DEBUG, "cache.operation", operation = operation)
}
