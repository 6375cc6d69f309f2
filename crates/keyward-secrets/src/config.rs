//! Resolver configuration.

use keyward_core::{Error, Result, SecretString};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_ENCRYPTION_SEED: &str = "KEYWARD_ENCRYPTION_SEED";
pub const ENV_CACHE_TTL_SECS: &str = "KEYWARD_CACHE_TTL_SECS";
pub const ENV_PROVIDER_TIMEOUT_MS: &str = "KEYWARD_PROVIDER_TIMEOUT_MS";
pub const ENV_ENABLE_ENV: &str = "KEYWARD_ENABLE_ENV";
pub const ENV_ENABLE_PLATFORM: &str = "KEYWARD_ENABLE_PLATFORM";
pub const ENV_ENABLE_VAULT: &str = "KEYWARD_ENABLE_VAULT";
pub const ENV_ENV_PREFIX: &str = "KEYWARD_ENV_PREFIX";
pub const ENV_PLATFORM_BINDINGS_FILE: &str = "KEYWARD_PLATFORM_BINDINGS_FILE";
pub const ENV_SWEEP_INTERVAL_SECS: &str = "KEYWARD_SWEEP_INTERVAL_SECS";

const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 5_000;

/// Which built-in providers to put in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderFlags {
    pub env: bool,
    pub platform: bool,
    pub vault: bool,
}

impl Default for ProviderFlags {
    fn default() -> Self {
        Self {
            env: true,
            platform: true,
            vault: false,
        }
    }
}

/// Configuration for the unified secret resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Seed the cache encryption key is derived from.
    pub encryption_seed: Option<SecretString>,
    /// TTL applied when a call does not override it. `None` never expires.
    pub default_ttl: Option<Duration>,
    /// Upper bound on a single provider call.
    pub provider_timeout: Duration,
    pub providers: ProviderFlags,
    /// Prefix for the environment provider (`PREFIX_KEY`).
    pub env_prefix: Option<String>,
    /// JSON object file feeding the platform binding provider.
    pub platform_bindings_file: Option<PathBuf>,
    /// Interval for the optional background sweeper.
    pub sweep_interval: Option<Duration>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            encryption_seed: None,
            default_ttl: Some(Duration::from_secs(DEFAULT_CACHE_TTL_SECS)),
            provider_timeout: Duration::from_millis(DEFAULT_PROVIDER_TIMEOUT_MS),
            providers: ProviderFlags::default(),
            env_prefix: None,
            platform_bindings_file: None,
            sweep_interval: None,
        }
    }
}

impl ResolverConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ProviderFlags::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            encryption_seed: get(ENV_ENCRYPTION_SEED).map(SecretString::new),
            default_ttl: Some(Duration::from_secs(
                parse_positive(ENV_CACHE_TTL_SECS, get(ENV_CACHE_TTL_SECS))?
                    .unwrap_or(DEFAULT_CACHE_TTL_SECS),
            )),
            provider_timeout: Duration::from_millis(
                parse_positive(ENV_PROVIDER_TIMEOUT_MS, get(ENV_PROVIDER_TIMEOUT_MS))?
                    .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_MS),
            ),
            providers: ProviderFlags {
                env: parse_flag(ENV_ENABLE_ENV, get(ENV_ENABLE_ENV))?.unwrap_or(defaults.env),
                platform: parse_flag(ENV_ENABLE_PLATFORM, get(ENV_ENABLE_PLATFORM))?
                    .unwrap_or(defaults.platform),
                vault: parse_flag(ENV_ENABLE_VAULT, get(ENV_ENABLE_VAULT))?
                    .unwrap_or(defaults.vault),
            },
            env_prefix: get(ENV_ENV_PREFIX),
            platform_bindings_file: get(ENV_PLATFORM_BINDINGS_FILE).map(PathBuf::from),
            sweep_interval: parse_positive(ENV_SWEEP_INTERVAL_SECS, get(ENV_SWEEP_INTERVAL_SECS))?
                .map(Duration::from_secs),
        })
    }

    pub fn with_seed(mut self, seed: impl Into<SecretString>) -> Self {
        self.encryption_seed = Some(seed.into());
        self
    }

    pub fn with_default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn with_providers(mut self, providers: ProviderFlags) -> Self {
        self.providers = providers;
        self
    }
}

fn parse_positive(name: &str, value: Option<String>) -> Result<Option<u64>> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.trim().parse::<u64>() {
        Ok(0) => Err(Error::Configuration(format!("{} must be greater than zero", name))),
        Ok(n) => Ok(Some(n)),
        Err(_) => Err(Error::Configuration(format!(
            "{} must be a positive integer, got {:?}",
            name, value
        ))),
    }
}

fn parse_flag(name: &str, value: Option<String>) -> Result<Option<bool>> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(Error::Configuration(format!(
            "{} must be a boolean, got {:?}",
            name, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.encryption_seed.is_none());
        assert_eq!(config.default_ttl, Some(Duration::from_secs(300)));
        assert_eq!(config.provider_timeout, Duration::from_secs(5));
        assert_eq!(config.providers, ProviderFlags::default());
        assert!(config.sweep_interval.is_none());
    }

    #[test]
    fn test_full_environment() {
        let config = ResolverConfig::from_lookup(lookup(&[
            (ENV_ENCRYPTION_SEED, "seed-from-environment-123"),
            (ENV_CACHE_TTL_SECS, "60"),
            (ENV_PROVIDER_TIMEOUT_MS, "250"),
            (ENV_ENABLE_ENV, "off"),
            (ENV_ENABLE_VAULT, "TRUE"),
            (ENV_ENV_PREFIX, "APP"),
            (ENV_PLATFORM_BINDINGS_FILE, "/run/bindings.json"),
            (ENV_SWEEP_INTERVAL_SECS, "30"),
        ]))
        .unwrap();

        assert_eq!(
            config.encryption_seed.as_ref().map(|s| s.expose_secret()),
            Some("seed-from-environment-123")
        );
        assert_eq!(config.default_ttl, Some(Duration::from_secs(60)));
        assert_eq!(config.provider_timeout, Duration::from_millis(250));
        assert_eq!(
            config.providers,
            ProviderFlags {
                env: false,
                platform: true,
                vault: true
            }
        );
        assert_eq!(config.env_prefix.as_deref(), Some("APP"));
        assert_eq!(
            config.platform_bindings_file,
            Some(PathBuf::from("/run/bindings.json"))
        );
        assert_eq!(config.sweep_interval, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let err = ResolverConfig::from_lookup(lookup(&[(ENV_CACHE_TTL_SECS, "0")])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_rejects_bad_flag() {
        let err = ResolverConfig::from_lookup(lookup(&[(ENV_ENABLE_PLATFORM, "maybe")])).unwrap_err();
        assert!(err.to_string().contains(ENV_ENABLE_PLATFORM));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = ResolverConfig::from_lookup(lookup(&[
            (ENV_ENCRYPTION_SEED, "   "),
            (ENV_CACHE_TTL_SECS, ""),
        ]))
        .unwrap();
        assert!(config.encryption_seed.is_none());
        assert_eq!(config.default_ttl, Some(Duration::from_secs(300)));
    }
}
