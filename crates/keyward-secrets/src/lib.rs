//! Unified secret resolution for Keyward.
//!
//! A [`UnifiedSecretResolver`] answers `get_secret(key)` from an encrypted,
//! TTL-bounded in-memory cache, falling back to an ordered chain of
//! [`SecretProvider`]s where the first provider holding the key wins.

pub mod cache;
pub mod cipher;
pub mod clock;
pub mod config;
pub mod metrics;
pub mod providers;
pub mod resolver;
pub mod shared;
pub mod vault;

pub use cache::{CacheEntry, CacheStats, EncryptedCache};
pub use cipher::CacheCipher;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ProviderFlags, ResolverConfig};
pub use metrics::{MetricsSink, RecordingSink, TracingSink};
pub use providers::{EnvProvider, PlatformBindingProvider, SecretProvider};
pub use resolver::{ResolverBuilder, UnifiedSecretResolver};
pub use vault::{ExternalVaultProvider, VaultClient};
