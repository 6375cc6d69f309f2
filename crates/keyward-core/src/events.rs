//! Resolution telemetry events.

use crate::secrets::{KeyHash, SecretSource};
use serde::{Deserialize, Serialize};

/// A telemetry event emitted while resolving a secret.
///
/// Events carry key hashes only and are safe to forward to any logging or
/// metrics pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ResolutionEvent {
    Resolve {
        key_hash: KeyHash,
        source: SecretSource,
        /// 0 for cache hits, otherwise the 1-based provider position.
        depth: usize,
        elapsed_ms: f64,
    },
    Miss {
        key_hash: KeyHash,
    },
    ProviderError {
        key_hash: KeyHash,
        provider: String,
        kind: String,
    },
    IntegrityFailure {
        key_hash: KeyHash,
    },
}

impl ResolutionEvent {
    pub fn key_hash(&self) -> &KeyHash {
        match self {
            ResolutionEvent::Resolve { key_hash, .. }
            | ResolutionEvent::Miss { key_hash }
            | ResolutionEvent::ProviderError { key_hash, .. }
            | ResolutionEvent::IntegrityFailure { key_hash } => key_hash,
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
