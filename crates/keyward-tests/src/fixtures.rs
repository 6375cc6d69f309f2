//! Provider test doubles.

use async_trait::async_trait;
use keyward_core::{Error, Result, SecretKey, SecretResult, SecretSource};
use keyward_secrets::SecretProvider;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Serves a fixed map, optionally after a delay, and counts calls.
pub struct StaticProvider {
    name: String,
    source: SecretSource,
    values: HashMap<String, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticProvider {
    pub fn new(name: impl Into<String>, source: SecretSource) -> Self {
        Self {
            name: name.into(),
            source,
            values: HashMap::new(),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    /// Sleep before answering, to model a network-bound backend.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretProvider for StaticProvider {
    async fn get(&self, key: &SecretKey) -> Result<Option<SecretResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .values
            .get(key.as_str())
            .map(|v| SecretResult::new(key.clone(), v.as_str(), self.source)))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> SecretSource {
        self.source
    }
}

/// Always fails with a transient error.
pub struct FailingProvider {
    calls: AtomicUsize,
}

impl FailingProvider {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for FailingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretProvider for FailingProvider {
    async fn get(&self, _key: &SecretKey) -> Result<Option<SecretResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::transient("failing", "upstream returned 503"))
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn source(&self) -> SecretSource {
        SecretSource::External
    }
}

/// Hangs forever for the listed keys and reports absence for the rest.
pub struct HangingProvider {
    hang_on: Vec<String>,
}

impl HangingProvider {
    pub fn for_keys(keys: &[&str]) -> Self {
        Self {
            hang_on: keys.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[async_trait]
impl SecretProvider for HangingProvider {
    async fn get(&self, key: &SecretKey) -> Result<Option<SecretResult>> {
        if self.hang_on.iter().any(|k| k == key.as_str()) {
            std::future::pending::<()>().await;
        }
        Ok(None)
    }

    fn name(&self) -> &str {
        "hanging"
    }

    fn source(&self) -> SecretSource {
        SecretSource::External
    }
}

/// Returns `<prefix>-<n>` on the n-th call, modelling a rotating secret.
pub struct RotatingProvider {
    prefix: String,
    calls: AtomicUsize,
}

impl RotatingProvider {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretProvider for RotatingProvider {
    async fn get(&self, key: &SecretKey) -> Result<Option<SecretResult>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Some(SecretResult::new(
            key.clone(),
            format!("{}-{}", self.prefix, n),
            SecretSource::Platform,
        )))
    }

    fn name(&self) -> &str {
        "rotating"
    }

    fn source(&self) -> SecretSource {
        SecretSource::Platform
    }
}
