//! Concurrent callers sharing one resolver.
//!
//! Run with: `cargo test -p keyward-tests --test concurrency_tests`

use futures::future::join_all;
use keyward_core::{Error, SecretKey, SecretSource};
use keyward_secrets::SecretProvider;
use keyward_tests::{
    fixtures::{HangingProvider, StaticProvider},
    helpers::recording_resolver,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_cold_reads_agree() {
    let provider: Arc<dyn SecretProvider> = Arc::new(
        StaticProvider::new("platform", SecretSource::Platform)
            .with("DB_PASSWORD", "hunter2")
            .with_delay(Duration::from_millis(5)),
    );
    let (resolver, _sink) = recording_resolver(vec![provider]);
    let resolver = Arc::new(resolver);

    let handles = (0..50).map(|_| {
        let resolver = resolver.clone();
        tokio::spawn(async move {
            resolver
                .get_secret(&SecretKey::new("DB_PASSWORD"), None)
                .await
        })
    });

    for joined in join_all(handles).await {
        let result = joined.unwrap().unwrap();
        assert_eq!(result.value.expose_secret(), "hunter2");
    }

    let stats = resolver.cache_stats();
    assert_eq!(stats.entries, 1);
    assert!(stats.writes >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mixed_keys_in_parallel() {
    let mut provider = StaticProvider::new("platform", SecretSource::Platform);
    for i in 0..10 {
        provider = provider.with(&format!("KEY_{}", i), &format!("value-{}", i));
    }
    let provider: Arc<dyn SecretProvider> = Arc::new(provider);
    let (resolver, _sink) = recording_resolver(vec![provider]);
    let resolver = Arc::new(resolver);

    let handles = (0..100).map(|n| {
        let resolver = resolver.clone();
        tokio::spawn(async move {
            let i = n % 10;
            let result = resolver
                .get_secret(&SecretKey::new(format!("KEY_{}", i)), None)
                .await
                .unwrap();
            (i, result)
        })
    });

    for joined in join_all(handles).await {
        let (i, result) = joined.unwrap();
        assert_eq!(result.value.expose_secret(), format!("value-{}", i));
    }
    assert_eq!(resolver.cache_stats().entries, 10);
}

#[tokio::test]
async fn test_hung_key_does_not_block_other_keys() {
    let hanging: Arc<dyn SecretProvider> = Arc::new(HangingProvider::for_keys(&["SLOW_KEY"]));
    let holder: Arc<dyn SecretProvider> = Arc::new(
        StaticProvider::new("holder", SecretSource::Platform)
            .with("FAST_KEY", "fast")
            .with("SLOW_KEY", "slow"),
    );
    let (resolver, _sink) = recording_resolver(vec![hanging, holder]);
    let resolver = Arc::new(resolver);

    let slow = {
        let resolver = resolver.clone();
        tokio::spawn(async move { resolver.get_secret(&SecretKey::new("SLOW_KEY"), None).await })
    };

    let start = Instant::now();
    let fast = resolver.get_secret(&SecretKey::new("FAST_KEY"), None).await.unwrap();
    assert_eq!(fast.value.expose_secret(), "fast");
    // Well under the 200ms provider timeout the slow key is waiting on.
    assert!(start.elapsed() < Duration::from_millis(150));

    // The hung provider times out and the next provider answers.
    let slow = slow.await.unwrap().unwrap();
    assert_eq!(slow.value.expose_secret(), "slow");
    assert_eq!(slow.source, SecretSource::Platform);
}

#[tokio::test]
async fn test_hung_provider_alone_yields_not_found() {
    let hanging: Arc<dyn SecretProvider> = Arc::new(HangingProvider::for_keys(&["SLOW_KEY"]));
    let (resolver, sink) = recording_resolver(vec![hanging]);

    let err = resolver
        .get_secret(&SecretKey::new("SLOW_KEY"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SecretNotFound(_)));
    assert_eq!(sink.events().len(), 2);
}

#[tokio::test]
async fn test_registration_during_reads() {
    let base: Arc<dyn SecretProvider> =
        Arc::new(StaticProvider::new("base", SecretSource::Env).with("K", "base"));
    let (resolver, _sink) = recording_resolver(vec![base]);
    let resolver = Arc::new(resolver);

    let readers = (0..20).map(|_| {
        let resolver = resolver.clone();
        tokio::spawn(async move {
            resolver.invalidate(&SecretKey::new("K"));
            resolver.get_secret(&SecretKey::new("K"), None).await
        })
    });
    let extra: Arc<dyn SecretProvider> =
        Arc::new(StaticProvider::new("extra", SecretSource::External).with("K", "extra"));
    resolver.register_provider(extra, 0).await;

    for joined in join_all(readers).await {
        let value = joined.unwrap().unwrap().value;
        assert!(value.expose_secret() == "base" || value.expose_secret() == "extra");
    }
    assert_eq!(resolver.provider_names().await, ["extra", "base"]);
}
