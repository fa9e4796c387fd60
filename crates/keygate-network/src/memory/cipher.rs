//! Symmetric encryption for the in-memory network.
//!
//! The network's master secret never leaves the network. Each ciphertext is
//! sealed under a key derived from that secret, the condition set digest and
//! the plaintext hash, so a ciphertext only opens for the same condition set.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;

use keygate_core::{Blake3Hash, DataHash};

use crate::error::{NetworkError, Result};

const NONCE_LEN: usize = 12;

/// The network's root secret.
pub struct MasterSecret([u8; 32]);

impl MasterSecret {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Key for ciphertext bound to `conditions` and `data_hash`.
    pub fn derive_key(&self, conditions: &Blake3Hash, data_hash: &DataHash) -> EncryptionKey {
        let mut hasher = blake3::Hasher::new_derive_key("keygate-network-v0-encryption");
        hasher.update(&self.0);
        hasher.update(conditions.as_bytes());
        hasher.update(data_hash.as_str().as_bytes());
        EncryptionKey(*hasher.finalize().as_bytes())
    }
}

/// A 256-bit ChaCha20-Poly1305 key.
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Seal `plaintext` under a fresh nonce; returns base64(nonce || sealed).
    pub fn seal(&self, plaintext: &[u8]) -> Result<String> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| NetworkError::InvalidRequest(e.to_string()))?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| NetworkError::InvalidRequest(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(STANDARD.encode(out))
    }

    /// Open a ciphertext produced by [`Self::seal`].
    pub fn open(&self, ciphertext: &str) -> Result<Vec<u8>> {
        let bytes = STANDARD
            .decode(ciphertext)
            .map_err(|e| NetworkError::DecryptionFailed(format!("ciphertext not base64: {e}")))?;
        if bytes.len() < NONCE_LEN {
            return Err(NetworkError::DecryptionFailed("ciphertext too short".into()));
        }
        let (nonce, sealed) = bytes.split_at(NONCE_LEN);

        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| NetworkError::DecryptionFailed(e.to_string()))?;
        cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| NetworkError::DecryptionFailed("authentication failed".into()))
    }
}
