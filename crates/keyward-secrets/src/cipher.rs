//! AES-256-GCM wrapper used to keep cached secrets encrypted in memory.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use keyward_core::{Error, Result};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Minimum accepted seed length in bytes, after trimming whitespace.
pub const MIN_SEED_LEN: usize = 16;

const KEY_DERIVATION_LABEL: &[u8] = b"keyward.cache.v1:";

/// Output of a single encryption.
pub struct Sealed {
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
}

/// Authenticated cipher holding a key derived at construction time.
pub struct CacheCipher {
    cipher: Aes256Gcm,
}

impl CacheCipher {
    /// Create a cipher from a raw 32-byte key.
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    /// Derive the key from a configuration seed (SHA-256 over a fixed label
    /// and the trimmed seed).
    pub fn from_seed(seed: &str) -> Result<Self> {
        let seed = seed.trim();
        if seed.len() < MIN_SEED_LEN {
            return Err(Error::Configuration(format!(
                "encryption seed must be at least {} bytes",
                MIN_SEED_LEN
            )));
        }

        let mut hasher = Sha256::new();
        hasher.update(KEY_DERIVATION_LABEL);
        hasher.update(seed.as_bytes());
        let mut key: [u8; 32] = hasher.finalize().into();
        let cipher = Self::new(&key);
        key.zeroize();
        Ok(cipher)
    }

    /// Encrypt `plaintext` under a fresh random nonce, authenticating `aad`.
    pub fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Result<Sealed> {
        let nonce: [u8; NONCE_LEN] = rand::random();
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), Payload { msg: plaintext, aad })
            .map_err(|e| Error::Encryption(e.to_string()))?;

        Ok(Sealed { nonce, ciphertext })
    }

    /// Decrypt and verify. Any tag mismatch yields `None`.
    pub fn open(&self, nonce: &[u8; NONCE_LEN], ciphertext: &[u8], aad: &[u8]) -> Option<Vec<u8>> {
        self.cipher
            .decrypt(Nonce::from_slice(nonce), Payload { msg: ciphertext, aad })
            .ok()
    }
}
