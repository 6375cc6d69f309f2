//! Error types for Keyward.

use crate::secrets::{KeyHash, SecretKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Caller-visible errors
    #[error("Secret not found: {}", .0.hash())]
    SecretNotFound(SecretKey),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Provider errors (absorbed by the resolver)
    #[error("Provider {provider} failed: {message}")]
    ProviderTransient { provider: String, message: String },

    #[error("Provider {provider} timed out after {timeout_ms}ms")]
    ProviderTimeout { provider: String, timeout_ms: u64 },

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    // Cache errors (absorbed by the resolver)
    #[error("Cached secret {0} failed integrity verification")]
    DecryptionIntegrity(KeyHash),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    // Infrastructure errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable label for logs and metrics. Never contains key names or values.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::SecretNotFound(_) => "not_found",
            Error::Configuration(_) => "configuration",
            Error::ProviderTransient { .. } => "transient",
            Error::ProviderTimeout { .. } => "timeout",
            Error::ProviderUnavailable(_) => "unavailable",
            Error::DecryptionIntegrity(_) => "integrity",
            Error::Encryption(_) => "encryption",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::Internal(_) => "internal",
        }
    }

    /// Whether the error is part of the resolver's public failure contract.
    pub fn is_caller_visible(&self) -> bool {
        matches!(self, Error::SecretNotFound(_) | Error::Configuration(_))
    }

    pub fn transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ProviderTransient {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
