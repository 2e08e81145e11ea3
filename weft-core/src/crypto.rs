//! Slab encryption
//!
//! Each slab owns a fresh 32-byte symmetric key. The key derives one
//! XChaCha20 keystream per shard index (the index is folded into the
//! nonce), so no two shards ever share keystream bytes. Encryption is a
//! plain XOR and therefore involutive; partial shard regions decrypt by
//! seeking the keystream to the region's byte offset.

use crate::error::{Result, WeftError};
use chacha20::cipher::{KeyIvInit, StreamCipher, StreamCipherSeek};
use chacha20::XChaCha20;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Slab key size (32 bytes)
pub const KEY_SIZE: usize = 32;

/// Per-slab symmetric encryption key
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlabKey([u8; KEY_SIZE]);

impl SlabKey {
    /// Generate a new random key
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut key = [0u8; KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice (validates length)
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != KEY_SIZE {
            return Err(WeftError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: slice.len(),
            });
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(slice);
        Ok(Self(key))
    }

    /// Get the raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// XOR `data` in place with the keystream for `shard_index`, starting
    /// at byte `offset` within the shard
    ///
    /// Applying the same call twice restores the original bytes.
    pub fn xor_keystream(&self, shard_index: u8, offset: u64, data: &mut [u8]) {
        // Nonce byte 1 carries the shard index; deployed hosts and prior
        // ciphertext depend on this exact layout.
        let mut nonce = [0u8; 24];
        nonce[1] = shard_index;

        let mut cipher = XChaCha20::new((&self.0).into(), (&nonce).into());
        cipher.seek(offset);
        cipher.apply_keystream(data);
    }
}

impl fmt::Debug for SlabKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlabKey([REDACTED])")
    }
}

impl Drop for SlabKey {
    fn drop(&mut self) {
        // Zero key material on drop
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique() {
        let a = SlabKey::generate();
        let b = SlabKey::generate();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_from_slice_validates_length() {
        assert!(SlabKey::from_slice(&[0u8; 16]).is_err());
        assert!(SlabKey::from_slice(&[0u8; 32]).is_ok());
    }

    #[test]
    fn test_xor_involutive() {
        let key = SlabKey::generate();
        let original = vec![0x5au8; 4096];

        let mut data = original.clone();
        key.xor_keystream(3, 0, &mut data);
        assert_ne!(data, original);

        key.xor_keystream(3, 0, &mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn test_shard_indices_get_distinct_streams() {
        let key = SlabKey::generate();

        let mut a = vec![0u8; 256];
        let mut b = vec![0u8; 256];
        key.xor_keystream(0, 0, &mut a);
        key.xor_keystream(1, 0, &mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn test_seek_matches_full_stream() {
        let key = SlabKey::generate();

        // Encrypt a full shard, then decrypt only a tail region by seeking.
        let original = (0..1024).map(|i| (i % 251) as u8).collect::<Vec<u8>>();
        let mut full = original.clone();
        key.xor_keystream(7, 0, &mut full);

        let mut region = full[256..768].to_vec();
        key.xor_keystream(7, 256, &mut region);
        assert_eq!(region, &original[256..768]);
    }

    #[test]
    fn test_debug_redacted() {
        let key = SlabKey::generate();
        assert_eq!(format!("{:?}", key), "SlabKey([REDACTED])");
    }
}
