//! Optional process-wide resolver.
//!
//! Nothing in the crate depends on this; it exists for binaries that want a
//! single environment-configured resolver without threading one through.

use crate::config::ResolverConfig;
use crate::resolver::UnifiedSecretResolver;
use keyward_core::Result;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

static GLOBAL: OnceCell<Arc<UnifiedSecretResolver>> = OnceCell::const_new();

/// The shared resolver, built from the environment on first use.
///
/// Starts the background sweeper when `KEYWARD_SWEEP_INTERVAL_SECS` is set.
/// A configuration error is returned to every caller until one succeeds.
pub async fn global() -> Result<Arc<UnifiedSecretResolver>> {
    init_once(&GLOBAL, ResolverConfig::from_env).await
}

async fn init_once<F>(
    cell: &OnceCell<Arc<UnifiedSecretResolver>>,
    load: F,
) -> Result<Arc<UnifiedSecretResolver>>
where
    F: FnOnce() -> Result<ResolverConfig>,
{
    cell.get_or_try_init(|| async move {
        let config = load()?;
        let resolver = Arc::new(UnifiedSecretResolver::from_config(&config).await?);
        if let Some(interval) = config.sweep_interval {
            resolver.spawn_sweeper(interval)?;
            info!(interval_secs = interval.as_secs(), "Started secret cache sweeper");
        }
        Ok::<_, keyward_core::Error>(resolver)
    })
    .await
    .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyward_core::Error;

    const SEED: &str = "shared-test-seed-0123456789";

    fn lookup(seed: Option<&'static str>) -> impl FnOnce() -> Result<ResolverConfig> {
        move || {
            ResolverConfig::from_lookup(|name| match name {
                crate::config::ENV_ENCRYPTION_SEED => seed.map(str::to_string),
                _ => None,
            })
        }
    }

    #[tokio::test]
    async fn test_missing_seed_is_reported_and_retried() {
        let cell = OnceCell::new();

        let err = init_once(&cell, lookup(None)).await.err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(!cell.initialized());

        assert!(init_once(&cell, lookup(Some(SEED))).await.is_ok());
    }

    #[tokio::test]
    async fn test_second_call_returns_same_instance() {
        let cell = OnceCell::new();

        let first = init_once(&cell, lookup(Some(SEED))).await.unwrap();
        // The loader is not consulted once the cell holds a resolver.
        let second = init_once(&cell, lookup(None)).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }
}
