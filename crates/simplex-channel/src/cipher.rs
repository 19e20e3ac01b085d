//! Keystream cipher and authentication tag for ratchet channels.
//!
//! ```text
//! block[0]   = H(key)
//! block[i+1] = H(block[i])
//! ciphertext = plaintext XOR (block[0] || block[1] || ...)
//! tag        = H(key || ciphertext)[..16]
//! ```
//!
//! H is BLAKE3. There is no nonce: the ratchet must never reuse a key.

use std::fmt;

use simplex_core::{phi_hash, Digest};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of the truncated authentication tag.
pub const TAG_LEN: usize = 16;

/// Characters of the φ hash shown as a key fingerprint.
const FINGERPRINT_LEN: usize = 12;

/// 32 bytes of channel key material, zeroed on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; 32]);

impl SecretKey {
    /// Derive a key by hashing a seed.
    pub fn derive(seed: &[u8]) -> Self {
        Self(*Digest::hash(seed).as_bytes())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The key that follows this one at ratchet step `step`.
    ///
    /// Only the low 32 bits of the step are mixed in, big-endian.
    pub fn ratchet(&self, step: u64) -> Self {
        let step = (step as u32).to_be_bytes();
        Self(*Digest::hash_concat(&[self.0.as_slice(), step.as_slice()]).as_bytes())
    }

    /// A short, non-reversible label for logs and status output.
    pub fn fingerprint(&self) -> String {
        let mut hash = phi_hash(&self.0);
        hash.truncate(FINGERPRINT_LEN);
        hash
    }

    /// `len` bytes of keystream.
    pub fn keystream(&self, len: usize) -> Vec<u8> {
        let mut stream = Vec::with_capacity(len + Digest::LEN);
        let mut block = Digest::hash(&self.0);
        while stream.len() < len {
            stream.extend_from_slice(block.as_bytes());
            block = Digest::hash(block.as_bytes());
        }
        stream.truncate(len);
        stream
    }

    /// XOR `data` with the keystream. Encrypts and decrypts alike.
    pub fn apply_keystream(&self, data: &[u8]) -> Vec<u8> {
        data.iter()
            .zip(self.keystream(data.len()))
            .map(|(byte, key)| byte ^ key)
            .collect()
    }

    /// Truncated tag over `ciphertext`.
    pub fn tag(&self, ciphertext: &[u8]) -> [u8; TAG_LEN] {
        let digest = Digest::hash_concat(&[self.0.as_slice(), ciphertext]);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&digest.as_bytes()[..TAG_LEN]);
        tag
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey({})", self.fingerprint())
    }
}
