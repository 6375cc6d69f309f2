//! External vault provider.
//!
//! The provider is a placeholder around a pluggable [`VaultClient`]. With no
//! client configured, or with a client that reports itself unavailable, every
//! lookup is a silent miss so the rest of the chain keeps working.

use crate::providers::SecretProvider;
use async_trait::async_trait;
use keyward_core::{Error, Result, SecretKey, SecretResult, SecretSource, SecretString};
use std::sync::Arc;
use tracing::debug;

/// Minimal read interface a vault backend must offer.
#[async_trait]
pub trait VaultClient: Send + Sync {
    /// Read the secret stored at `path`.
    ///
    /// Return `Error::ProviderUnavailable` when the backend cannot be reached
    /// at all; the provider degrades that to "absent".
    async fn read(&self, path: &str) -> Result<Option<SecretString>>;

    fn name(&self) -> &str;
}

/// Secret provider backed by an optional external vault client.
#[derive(Clone, Default)]
pub struct ExternalVaultProvider {
    client: Option<Arc<dyn VaultClient>>,
    path_prefix: Option<String>,
}

impl ExternalVaultProvider {
    /// A provider with no backing client; it never finds anything.
    pub fn unconfigured() -> Self {
        Self::default()
    }

    pub fn new(client: Arc<dyn VaultClient>) -> Self {
        Self {
            client: Some(client),
            path_prefix: None,
        }
    }

    /// Read keys under `prefix/` instead of at the root.
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into().trim_end_matches('/').to_string());
        self
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    fn path_for(&self, key: &SecretKey) -> String {
        match &self.path_prefix {
            Some(prefix) => format!("{}/{}", prefix, key.as_str()),
            None => key.as_str().to_string(),
        }
    }
}

#[async_trait]
impl SecretProvider for ExternalVaultProvider {
    async fn get(&self, key: &SecretKey) -> Result<Option<SecretResult>> {
        let Some(client) = &self.client else {
            return Ok(None);
        };

        match client.read(&self.path_for(key)).await {
            Ok(value) => Ok(value.map(|v| SecretResult::new(key.clone(), v, SecretSource::External))),
            Err(Error::ProviderUnavailable(_)) => {
                debug!(
                    client = client.name(),
                    key_hash = %key.hash(),
                    "Vault client unavailable, treating as absent"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &str {
        "vault"
    }

    fn source(&self) -> SecretSource {
        SecretSource::External
    }
}
