//! Unified secret resolver.
//!
//! Resolution order for a key:
//!
//! 1. the encrypted cache, if it holds a live entry;
//! 2. each provider in chain order, stopping at the first one that has it;
//! 3. otherwise a miss, reported to the metrics sink.
//!
//! Provider failures and timeouts are logged and skipped. A cache entry that
//! fails authentication is discarded and the key is resolved again.

use crate::cache::{CacheStats, EncryptedCache};
use crate::cipher::CacheCipher;
use crate::clock::{Clock, SystemClock};
use crate::config::{ENV_ENCRYPTION_SEED, ResolverConfig};
use crate::metrics::MetricsSink;
use crate::providers::{EnvProvider, PlatformBindingProvider, SecretProvider};
use crate::vault::ExternalVaultProvider;
use keyward_core::{Error, KeyHash, Result, SecretKey, SecretResult, SecretSource, SecretString};
use keyward_trace::{cache_span, provider_span, resolve_span};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, error, info, warn};

/// Builder for [`UnifiedSecretResolver`].
pub struct ResolverBuilder {
    seed: Option<SecretString>,
    default_ttl: Option<Duration>,
    provider_timeout: Duration,
    providers: Vec<Arc<dyn SecretProvider>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    clock: Arc<dyn Clock>,
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        let defaults = ResolverConfig::default();
        Self {
            seed: None,
            default_ttl: defaults.default_ttl,
            provider_timeout: defaults.provider_timeout,
            providers: Vec::new(),
            metrics: None,
            clock: Arc::new(SystemClock),
        }
    }
}

impl ResolverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a configuration, adding the built-in providers it enables
    /// in the order env, platform, vault.
    pub async fn from_config(config: &ResolverConfig) -> Result<Self> {
        let mut builder = Self::new()
            .default_ttl(config.default_ttl)
            .provider_timeout(config.provider_timeout);
        builder.seed = config.encryption_seed.clone();

        if config.providers.env {
            builder = builder.provider(Arc::new(EnvProvider::new(config.env_prefix.clone())));
        }
        if config.providers.platform {
            let platform = match &config.platform_bindings_file {
                Some(path) => PlatformBindingProvider::load_from_file(path).await?,
                None => PlatformBindingProvider::new(),
            };
            builder = builder.provider(Arc::new(platform));
        }
        if config.providers.vault {
            builder = builder.provider(Arc::new(ExternalVaultProvider::unconfigured()));
        }

        Ok(builder)
    }

    pub fn seed(mut self, seed: impl Into<SecretString>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    pub fn default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Append a provider to the end of the chain.
    pub fn provider(mut self, provider: Arc<dyn SecretProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn metrics(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(sink);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Derive the cache key and assemble the resolver.
    pub fn build(self) -> Result<UnifiedSecretResolver> {
        let seed = self.seed.ok_or_else(|| {
            Error::Configuration(format!("{} is not set", ENV_ENCRYPTION_SEED))
        })?;
        if self.provider_timeout.is_zero() {
            return Err(Error::Configuration(
                "provider timeout must be greater than zero".to_string(),
            ));
        }
        let cipher = CacheCipher::from_seed(seed.expose_secret())?;

        info!(
            providers = self.providers.len(),
            default_ttl_secs = self.default_ttl.map(|t| t.as_secs()),
            metrics = self.metrics.is_some(),
            "Secret resolver initialized"
        );

        Ok(UnifiedSecretResolver {
            cache: EncryptedCache::new(cipher, self.clock),
            providers: RwLock::new(self.providers),
            metrics: self.metrics,
            default_ttl: self.default_ttl,
            provider_timeout: self.provider_timeout,
        })
    }
}

/// Resolves secrets through the cache and an ordered provider chain.
///
/// Safe to share across tasks behind an `Arc`; every instance owns its own
/// cache and chain.
pub struct UnifiedSecretResolver {
    cache: EncryptedCache,
    providers: RwLock<Vec<Arc<dyn SecretProvider>>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    default_ttl: Option<Duration>,
    provider_timeout: Duration,
}

impl UnifiedSecretResolver {
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::new()
    }

    pub async fn from_config(config: &ResolverConfig) -> Result<Self> {
        ResolverBuilder::from_config(config).await?.build()
    }

    pub async fn from_env() -> Result<Self> {
        Self::from_config(&ResolverConfig::from_env()?).await
    }

    /// Resolve `key`, caching the result for `ttl_override` or the default TTL.
    pub async fn get_secret(
        &self,
        key: &SecretKey,
        ttl_override: Option<Duration>,
    ) -> Result<SecretResult> {
        let key_hash = key.hash();
        self.resolve(key, &key_hash, ttl_override)
            .instrument(resolve_span(&key_hash))
            .await
            .ok_or_else(|| Error::SecretNotFound(key.clone()))
    }

    /// Resolve `key`, returning `fallback` instead of failing when no source
    /// has it. Fallback values are not cached.
    pub async fn get_secret_with_fallback(
        &self,
        key: &SecretKey,
        fallback: impl Into<SecretString>,
    ) -> SecretString {
        let key_hash = key.hash();
        match self
            .resolve(key, &key_hash, None)
            .instrument(resolve_span(&key_hash))
            .await
        {
            Some(result) => result.value,
            None => {
                debug!(key_hash = %key_hash, "Using fallback value");
                fallback.into()
            }
        }
    }

    /// Insert a provider at `priority` (0 is consulted first). Indices past
    /// the end append. Returns the index used.
    pub async fn register_provider(&self, provider: Arc<dyn SecretProvider>, priority: usize) -> usize {
        let mut providers = self.providers.write().await;
        let index = priority.min(providers.len());
        info!(provider = provider.name(), index, "Registering secret provider");
        providers.insert(index, provider);
        index
    }

    /// Provider names in chain order.
    pub async fn provider_names(&self) -> Vec<String> {
        self.providers
            .read()
            .await
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Drop every cached entry.
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Secret cache cleared");
    }

    /// Drop the cached entry for one key.
    pub fn invalidate(&self, key: &SecretKey) -> bool {
        let removed = self.cache.remove(key);
        debug!(key_hash = %key.hash(), removed, "Secret cache entry invalidated");
        removed
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Periodically purge expired entries. Expiry is enforced on read either
    /// way; this only reclaims memory. The task ends once the resolver is
    /// dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> Result<JoinHandle<()>> {
        if interval.is_zero() {
            return Err(Error::Configuration(
                "sweep interval must be greater than zero".to_string(),
            ));
        }

        let resolver = Arc::downgrade(self);
        Ok(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(resolver) = resolver.upgrade() else {
                    break;
                };
                let purged = cache_span("sweep").in_scope(|| resolver.cache.purge_expired());
                if purged > 0 {
                    debug!(purged, "Swept expired secret cache entries");
                }
            }
        }))
    }

    async fn resolve(
        &self,
        key: &SecretKey,
        key_hash: &KeyHash,
        ttl_override: Option<Duration>,
    ) -> Option<SecretResult> {
        let start = Instant::now();

        if let Some(hit) = self.from_cache(key, key_hash) {
            return Some(hit);
        }

        // Snapshot the chain so no lock is held while providers run.
        let providers = self.providers.read().await.clone();

        for (index, provider) in providers.iter().enumerate() {
            let depth = index + 1;
            let outcome = self
                .query(provider.as_ref(), key)
                .instrument(provider_span(key_hash, provider.name(), depth))
                .await;

            match outcome {
                Ok(Some(found)) => {
                    return Some(self.accept(key, key_hash, found, depth, ttl_override, start));
                }
                Ok(None) => {
                    debug!(key_hash = %key_hash, provider = provider.name(), depth, "Secret not in provider");
                }
                Err(e) => {
                    warn!(
                        key_hash = %key_hash,
                        provider = provider.name(),
                        depth,
                        error_kind = e.kind(),
                        "Secret provider failed, trying next provider"
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.on_provider_error(key_hash, provider.name(), e.kind());
                    }
                }
            }
        }

        debug!(key_hash = %key_hash, providers = providers.len(), "Secret not found in any provider");
        if let Some(metrics) = &self.metrics {
            metrics.on_miss(key_hash);
        }
        None
    }

    fn from_cache(&self, key: &SecretKey, key_hash: &KeyHash) -> Option<SecretResult> {
        let entry = self.cache.get(key)?;

        let decrypt_start = Instant::now();
        match self.cache.decrypt(&entry) {
            Ok(value) => {
                let elapsed = elapsed_ms(decrypt_start);
                debug!(key_hash = %key_hash, origin = %entry.source(), "Secret cache hit");
                self.record_resolve(key_hash, SecretSource::Cache, 0, elapsed);
                Some(SecretResult {
                    key: key.clone(),
                    value,
                    source: SecretSource::Cache,
                    fetched_at: entry.stored_at(),
                    ttl: entry.ttl(),
                })
            }
            Err(e) => {
                error!(
                    key_hash = %key_hash,
                    error_kind = e.kind(),
                    "Cached secret failed integrity check, discarding entry"
                );
                self.cache.discard(&entry);
                if let Some(metrics) = &self.metrics {
                    metrics.on_integrity_failure(key_hash);
                }
                None
            }
        }
    }

    async fn query(&self, provider: &dyn SecretProvider, key: &SecretKey) -> Result<Option<SecretResult>> {
        match tokio::time::timeout(self.provider_timeout, provider.get(key)).await {
            Ok(result) => result,
            Err(_) => Err(Error::ProviderTimeout {
                provider: provider.name().to_string(),
                timeout_ms: self.provider_timeout.as_millis() as u64,
            }),
        }
    }

    fn accept(
        &self,
        key: &SecretKey,
        key_hash: &KeyHash,
        found: SecretResult,
        depth: usize,
        ttl_override: Option<Duration>,
        start: Instant,
    ) -> SecretResult {
        let ttl = ttl_override.or(self.default_ttl);

        if let Err(e) = self.cache.put(key, &found.value, found.source, ttl) {
            warn!(key_hash = %key_hash, error_kind = e.kind(), "Failed to cache resolved secret");
        }

        let elapsed = elapsed_ms(start);
        debug!(key_hash = %key_hash, source = %found.source, depth, elapsed_ms = elapsed, "Secret resolved");
        self.record_resolve(key_hash, found.source, depth, elapsed);

        SecretResult {
            key: key.clone(),
            value: found.value,
            source: found.source,
            fetched_at: found.fetched_at,
            ttl,
        }
    }

    fn record_resolve(&self, key_hash: &KeyHash, source: SecretSource, depth: usize, elapsed_ms: f64) {
        if let Some(metrics) = &self.metrics {
            metrics.on_resolve(key_hash, source, depth, elapsed_ms);
        }
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1_000.0
}
