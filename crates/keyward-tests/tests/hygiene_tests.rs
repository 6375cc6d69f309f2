//! Key names and values never reach logs or metrics.
//!
//! Run with: `cargo test -p keyward-tests --test hygiene_tests`

use keyward_core::{SecretKey, SecretSource};
use keyward_secrets::{SecretProvider, TracingSink, UnifiedSecretResolver};
use keyward_tests::{
    capture::LogCapture,
    fixtures::{FailingProvider, StaticProvider},
    helpers::{TEST_SEED, recording_resolver},
};
use std::sync::Arc;

const KEY_NAME: &str = "PAYMENTS_SIGNING_KEY";
const VALUE: &str = "sk_live_0123456789abcdef";

fn providers() -> Vec<Arc<dyn SecretProvider>> {
    vec![
        Arc::new(FailingProvider::new()),
        Arc::new(StaticProvider::new("platform", SecretSource::Platform).with(KEY_NAME, VALUE)),
    ]
}

#[tokio::test]
async fn test_logs_never_contain_key_or_value() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(capture.subscriber());

    let mut builder = UnifiedSecretResolver::builder()
        .seed(TEST_SEED)
        .metrics(Arc::new(TracingSink));
    for provider in providers() {
        builder = builder.provider(provider);
    }
    let resolver = builder.build().unwrap();
    let key = SecretKey::new(KEY_NAME);

    resolver.get_secret(&key, None).await.unwrap();
    resolver.get_secret(&key, None).await.unwrap();
    let _ = resolver.get_secret(&SecretKey::new("MISSING_ADMIN_PASSWORD"), None).await;
    resolver.invalidate(&key);
    resolver.clear_cache();

    let logs = capture.contents();
    assert!(!logs.is_empty());
    assert!(logs.contains(key.hash().as_str()));
    assert!(!logs.contains(KEY_NAME));
    assert!(!logs.contains(VALUE));
    assert!(!logs.contains("MISSING_ADMIN_PASSWORD"));
}

#[tokio::test]
async fn test_json_logs_never_contain_key_or_value() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(capture.json_subscriber());

    let (resolver, _sink) = recording_resolver(providers());
    let key = SecretKey::new(KEY_NAME);
    resolver.get_secret(&key, None).await.unwrap();
    resolver.get_secret(&key, None).await.unwrap();

    let logs = capture.contents();
    for line in logs.lines() {
        let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
        let rendered = parsed.to_string();
        assert!(!rendered.contains(KEY_NAME));
        assert!(!rendered.contains(VALUE));
    }
}

#[tokio::test]
async fn test_metrics_events_never_contain_key_or_value() {
    let (resolver, sink) = recording_resolver(providers());
    let key = SecretKey::new(KEY_NAME);

    resolver.get_secret(&key, None).await.unwrap();
    resolver.get_secret(&key, None).await.unwrap();
    let _ = resolver.get_secret(&SecretKey::new("MISSING_ADMIN_PASSWORD"), None).await;

    let events = sink.events();
    assert_eq!(events.len(), 5);
    for event in events {
        let json = event.to_json().unwrap();
        assert!(!json.contains(KEY_NAME));
        assert!(!json.contains(VALUE));
        assert!(!json.contains("MISSING_ADMIN_PASSWORD"));
    }
}

#[tokio::test]
async fn test_results_and_errors_render_safely() {
    let (resolver, _sink) = recording_resolver(providers());
    let key = SecretKey::new(KEY_NAME);

    let result = resolver.get_secret(&key, None).await.unwrap();
    let rendered = format!("{:?} {}", result, result.value);
    assert!(!rendered.contains(KEY_NAME));
    assert!(!rendered.contains(VALUE));

    let err = resolver
        .get_secret(&SecretKey::new("MISSING_ADMIN_PASSWORD"), None)
        .await
        .unwrap_err();
    let rendered = format!("{:?} {}", err, err);
    assert!(!rendered.contains("MISSING_ADMIN_PASSWORD"));
}
