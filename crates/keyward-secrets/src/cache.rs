//! Encrypted in-memory cache with per-entry TTL.
//!
//! Values are sealed with AES-256-GCM under a fresh nonce on every write and
//! the key name is bound in as associated data, so an entry only decrypts
//! under the key it was written for. Expiry is checked lazily on read;
//! [`EncryptedCache::purge_expired`] exists for optional sweeping.

use crate::cipher::{CacheCipher, NONCE_LEN};
use crate::clock::Clock;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use keyward_core::{Error, Result, SecretKey, SecretSource, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;
use zeroize::Zeroize;

/// A sealed cache entry.
///
/// Entries can only be created by [`EncryptedCache::put`].
#[derive(Debug, Clone)]
pub struct CacheEntry {
    key: SecretKey,
    ciphertext: Vec<u8>,
    nonce: [u8; NONCE_LEN],
    source: SecretSource,
    stored_at: DateTime<Utc>,
    ttl: Option<Duration>,
    generation: u64,
}

impl CacheEntry {
    pub fn key(&self) -> &SecretKey {
        &self.key
    }

    /// Source of the provider that originally produced the value.
    pub fn source(&self) -> SecretSource {
        self.source
    }

    pub fn stored_at(&self) -> DateTime<Utc> {
        self.stored_at
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// `None` when the entry never expires.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let ttl = chrono::Duration::from_std(self.ttl?).ok()?;
        self.stored_at.checked_add_signed(ttl)
    }

    /// Expired once strictly more than `ttl` has passed since `stored_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expires_at) => now > expires_at,
            None => false,
        }
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub writes: u64,
    pub integrity_failures: u64,
    pub purged: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    writes: AtomicU64,
    integrity_failures: AtomicU64,
    purged: AtomicU64,
}

/// Keyed store of ciphertext blobs.
pub struct EncryptedCache {
    cipher: CacheCipher,
    clock: Arc<dyn Clock>,
    entries: DashMap<SecretKey, CacheEntry>,
    next_generation: AtomicU64,
    counters: Counters,
}

impl EncryptedCache {
    pub fn new(cipher: CacheCipher, clock: Arc<dyn Clock>) -> Self {
        Self {
            cipher,
            clock,
            entries: DashMap::new(),
            next_generation: AtomicU64::new(0),
            counters: Counters::default(),
        }
    }

    /// Encrypt and store `value`, replacing any previous entry for `key`.
    pub fn put(
        &self,
        key: &SecretKey,
        value: &SecretString,
        source: SecretSource,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let sealed = self
            .cipher
            .seal(value.expose_secret().as_bytes(), key.as_str().as_bytes())?;

        let entry = CacheEntry {
            key: key.clone(),
            ciphertext: sealed.ciphertext,
            nonce: sealed.nonce,
            source,
            stored_at: self.clock.now(),
            ttl,
            generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
        };

        self.entries.insert(key.clone(), entry);
        self.counters.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Fetch a live entry. Expired entries are dropped and reported absent.
    pub fn get(&self, key: &SecretKey) -> Option<CacheEntry> {
        let Some(entry) = self.entries.get(key).map(|e| e.value().clone()) else {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        if entry.is_expired(self.clock.now()) {
            // A concurrent fresh write for the same key must survive.
            self.entries
                .remove_if(key, |_, current| current.generation == entry.generation);
            self.counters.expired.fetch_add(1, Ordering::Relaxed);
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key_hash = %key.hash(), "Cache entry expired");
            return None;
        }

        Some(entry)
    }

    /// Decrypt an entry, failing closed on any authentication error.
    ///
    /// A successful decrypt counts as a hit. A failed one counts as a miss.
    pub fn decrypt(&self, entry: &CacheEntry) -> Result<SecretString> {
        let integrity_error = || {
            self.counters
                .integrity_failures
                .fetch_add(1, Ordering::Relaxed);
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            Error::DecryptionIntegrity(entry.key.hash())
        };

        let plaintext = self
            .cipher
            .open(&entry.nonce, &entry.ciphertext, entry.key.as_str().as_bytes())
            .ok_or_else(integrity_error)?;

        match String::from_utf8(plaintext) {
            Ok(value) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Ok(SecretString::new(value))
            }
            Err(e) => {
                e.into_bytes().zeroize();
                Err(integrity_error())
            }
        }
    }

    /// Remove `entry` unless it has already been replaced by a newer write.
    pub fn discard(&self, entry: &CacheEntry) -> bool {
        self.entries
            .remove_if(&entry.key, |_, current| current.generation == entry.generation)
            .is_some()
    }

    pub fn remove(&self, key: &SecretKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop every expired entry and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        self.counters
            .purged
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            expired: self.counters.expired.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            integrity_failures: self.counters.integrity_failures.load(Ordering::Relaxed),
            purged: self.counters.purged.load(Ordering::Relaxed),
        }
    }

    /// Flip one bit of the stored ciphertext for `key`.
    #[cfg(test)]
    pub(crate) fn corrupt(&self, key: &SecretKey) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.ciphertext[0] ^= 0x01;
        }
    }
}
