//! Resolver construction helpers.

use keyward_core::{ResolutionEvent, SecretSource};
use keyward_secrets::{Clock, RecordingSink, SecretProvider, UnifiedSecretResolver};
use std::sync::Arc;
use std::time::Duration;

/// Seed used by every test resolver.
pub const TEST_SEED: &str = "integration-test-seed-0123456789";

/// Build a resolver over `providers` with a recording metrics sink.
pub fn recording_resolver(
    providers: Vec<Arc<dyn SecretProvider>>,
) -> (UnifiedSecretResolver, Arc<RecordingSink>) {
    recording_resolver_with_clock(providers, None)
}

/// Same as [`recording_resolver`], optionally with an injected clock.
pub fn recording_resolver_with_clock(
    providers: Vec<Arc<dyn SecretProvider>>,
    clock: Option<Arc<dyn Clock>>,
) -> (UnifiedSecretResolver, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let mut builder = UnifiedSecretResolver::builder()
        .seed(TEST_SEED)
        .default_ttl(Some(Duration::from_secs(60)))
        .provider_timeout(Duration::from_millis(200))
        .metrics(sink.clone());

    if let Some(clock) = clock {
        builder = builder.clock(clock);
    }
    for provider in providers {
        builder = builder.provider(provider);
    }

    let resolver = builder
        .build()
        .expect("test resolver configuration is valid");
    (resolver, sink)
}

/// `(source, depth, elapsed_ms)` of every resolve event, in order.
pub fn resolve_events(sink: &RecordingSink) -> Vec<(SecretSource, usize, f64)> {
    sink.events()
        .into_iter()
        .filter_map(|event| match event {
            ResolutionEvent::Resolve {
                source,
                depth,
                elapsed_ms,
                ..
            } => Some((source, depth, elapsed_ms)),
            _ => None,
        })
        .collect()
}
