//! Secret provider trait and the built-in environment and platform providers.

use async_trait::async_trait;
use keyward_core::{Error, Result, SecretKey, SecretResult, SecretSource, SecretString};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// A named, asynchronous source of secret values.
///
/// `Ok(None)` means the provider does not hold the key. Errors are reserved
/// for genuine failures (network, permissions); the resolver logs them and
/// moves on to the next provider.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Look up a secret by key.
    async fn get(&self, key: &SecretKey) -> Result<Option<SecretResult>>;

    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Source tag stamped on values this provider returns.
    fn source(&self) -> SecretSource;
}

/// Environment variable secret provider.
#[derive(Debug, Clone, Default)]
pub struct EnvProvider {
    prefix: Option<String>,
}

impl EnvProvider {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    fn resolve_name(&self, key: &SecretKey) -> String {
        match &self.prefix {
            Some(p) => format!("{}_{}", p, key.as_str()),
            None => key.as_str().to_string(),
        }
    }
}

#[async_trait]
impl SecretProvider for EnvProvider {
    async fn get(&self, key: &SecretKey) -> Result<Option<SecretResult>> {
        // Unset and non-UTF-8 variables are both treated as absent.
        Ok(std::env::var(self.resolve_name(key))
            .ok()
            .map(|value| SecretResult::new(key.clone(), value, SecretSource::Env)))
    }

    fn name(&self) -> &str {
        "env"
    }

    fn source(&self) -> SecretSource {
        SecretSource::Env
    }
}

/// Bindings injected by the hosting platform, supplied as a key/value map.
#[derive(Clone, Default)]
pub struct PlatformBindingProvider {
    bindings: HashMap<String, SecretString>,
}

impl PlatformBindingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(bindings: HashMap<String, String>) -> Self {
        Self::from_pairs(bindings)
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            bindings: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), SecretString::new(v)))
                .collect(),
        }
    }

    /// Load bindings from a JSON object of string values.
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Configuration(format!(
                "platform bindings file {}: {}",
                path.display(),
                e.kind()
            ))
        })?;

        // Parse errors can quote file content, so only the position is kept.
        let bindings: HashMap<String, String> = serde_json::from_str(&content).map_err(|e| {
            Error::Configuration(format!(
                "platform bindings file {} is not a JSON object of strings (line {}, column {})",
                path.display(),
                e.line(),
                e.column()
            ))
        })?;

        debug!(count = bindings.len(), "Loaded platform bindings");
        Ok(Self::from_map(bindings))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Debug for PlatformBindingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformBindingProvider")
            .field("bindings", &self.bindings.len())
            .finish()
    }
}

#[async_trait]
impl SecretProvider for PlatformBindingProvider {
    async fn get(&self, key: &SecretKey) -> Result<Option<SecretResult>> {
        Ok(self
            .bindings
            .get(key.as_str())
            .map(|value| SecretResult::new(key.clone(), value.clone(), SecretSource::Platform)))
    }

    fn name(&self) -> &str {
        "platform"
    }

    fn source(&self) -> SecretSource {
        SecretSource::Platform
    }
}
