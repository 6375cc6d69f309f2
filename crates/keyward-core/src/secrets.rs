//! Secret types.
//!
//! Nothing in this module renders a raw key name or a plaintext value through
//! `Debug`, `Display`, or serde. Key names surface as [`KeyHash`]; values
//! surface as `[REDACTED]` unless [`SecretString::expose_secret`] is called.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Number of hex characters kept from the key digest.
const KEY_HASH_LEN: usize = 8;

/// Case-sensitive name of a secret.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The raw key name. Pass it to backends, never to logs.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// One-way hash of the key name, safe for logs and metrics.
    pub fn hash(&self) -> KeyHash {
        KeyHash::of(&self.0)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey({})", self.hash())
    }
}

impl From<&str> for SecretKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for SecretKey {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// First 8 hex characters of the SHA-256 digest of a key name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyHash(String);

impl KeyHash {
    pub fn of(name: &str) -> Self {
        let digest = Sha256::digest(name.as_bytes());
        Self(hex::encode(&digest[..KEY_HASH_LEN / 2]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Plaintext secret material.
///
/// `Debug` and `Display` print `[REDACTED]`, serialization emits
/// `"[REDACTED]"`, and the buffer is zeroed when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the plaintext. Never log the result.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the plaintext.
    pub fn into_inner(mut self) -> String {
        std::mem::take(&mut self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecretString {}

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString)
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecretSource {
    Env,
    Platform,
    External,
    Cache,
}

impl SecretSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretSource::Env => "ENV",
            SecretSource::Platform => "PLATFORM",
            SecretSource::External => "EXTERNAL",
            SecretSource::Cache => "CACHE",
        }
    }
}

impl fmt::Display for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved secret. Lives in memory only.
#[derive(Debug, Clone)]
pub struct SecretResult {
    pub key: SecretKey,
    pub value: SecretString,
    pub source: SecretSource,
    pub fetched_at: DateTime<Utc>,
    pub ttl: Option<Duration>,
}

impl SecretResult {
    pub fn new(key: SecretKey, value: impl Into<SecretString>, source: SecretSource) -> Self {
        Self {
            key,
            value: value.into(),
            source,
            fetched_at: Utc::now(),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }
}
