//! TTL expiry with an injected clock.
//!
//! Run with: `cargo test -p keyward-tests --test expiry_tests`

use keyward_core::{SecretKey, SecretSource};
use keyward_secrets::{Clock, ManualClock, SecretProvider};
use keyward_tests::{fixtures::RotatingProvider, helpers::recording_resolver_with_clock};
use std::sync::Arc;
use std::time::Duration;

fn setup() -> (
    keyward_secrets::UnifiedSecretResolver,
    Arc<ManualClock>,
    Arc<RotatingProvider>,
) {
    let clock = Arc::new(ManualClock::default());
    let rotating = Arc::new(RotatingProvider::new("rev"));
    let providers: Vec<Arc<dyn SecretProvider>> = vec![rotating.clone()];
    let clock_handle: Arc<dyn Clock> = clock.clone();
    let (resolver, _sink) = recording_resolver_with_clock(providers, Some(clock_handle));
    (resolver, clock, rotating)
}

#[tokio::test]
async fn test_expired_entry_is_re_resolved() {
    let (resolver, clock, rotating) = setup();
    let key = SecretKey::new("ROTATED_TOKEN");

    let first = resolver.get_secret(&key, None).await.unwrap();
    assert_eq!(first.value.expose_secret(), "rev-1");

    clock.advance(Duration::from_secs(30));
    let cached = resolver.get_secret(&key, None).await.unwrap();
    assert_eq!(cached.source, SecretSource::Cache);
    assert_eq!(cached.value.expose_secret(), "rev-1");

    // Default TTL in the helpers is 60s.
    clock.advance(Duration::from_secs(31));
    let refreshed = resolver.get_secret(&key, None).await.unwrap();
    assert_eq!(refreshed.source, SecretSource::Platform);
    assert_eq!(refreshed.value.expose_secret(), "rev-2");
    assert_eq!(rotating.calls(), 2);

    assert_eq!(resolver.cache_stats().expired, 1);
}

#[tokio::test]
async fn test_ttl_override_applies_per_call() {
    let (resolver, clock, rotating) = setup();
    let key = SecretKey::new("SHORT_LIVED");

    resolver
        .get_secret(&key, Some(Duration::from_secs(1)))
        .await
        .unwrap();
    clock.advance(Duration::from_secs(2));

    let refreshed = resolver.get_secret(&key, None).await.unwrap();
    assert_eq!(refreshed.value.expose_secret(), "rev-2");
    assert_eq!(refreshed.ttl, Some(Duration::from_secs(60)));
    assert_eq!(rotating.calls(), 2);
}

#[tokio::test]
async fn test_cache_result_reports_original_fetch_time() {
    let (resolver, clock, _rotating) = setup();
    let key = SecretKey::new("K");

    let stored_at = clock.now();
    resolver.get_secret(&key, None).await.unwrap();
    clock.advance(Duration::from_secs(10));

    let cached = resolver.get_secret(&key, None).await.unwrap();
    assert_eq!(cached.source, SecretSource::Cache);
    assert_eq!(cached.fetched_at, stored_at);
    assert_eq!(cached.ttl, Some(Duration::from_secs(60)));
}
