//! Strong type definitions for Simplex.
//!
//! Digests and nonces are newtypes so they cannot be swapped by accident.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ChainError;

/// A 32-byte BLAKE3 digest.
///
/// Opaque; two digests are equal only if every byte matches.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Digest length in bytes.
    pub const LEN: usize = 32;

    /// The zero digest (sentinel value).
    pub const ZERO: Self = Self([0u8; 32]);

    /// Compute the BLAKE3 hash of the given data.
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Hash the concatenation of several byte slices without allocating.
    pub fn hash_concat(parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Hex of the first `bytes` bytes, used for the short forms in summaries.
    pub fn prefix_hex(&self, bytes: usize) -> String {
        hex::encode(&self.0[..bytes.min(Self::LEN)])
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != Self::LEN {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Digest {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// The per-chain nonce prefixed to every sealed payload.
///
/// Generated once when a chain is created and reused for every seal. It is the
/// chain's nonce, not a per-message one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainNonce(pub [u8; 32]);

impl ChainNonce {
    /// Nonce length in bytes.
    pub const LEN: usize = 32;

    /// Generate a fresh random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a byte slice of exactly [`ChainNonce::LEN`] bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self, ChainError> {
        let arr: [u8; 32] = slice.try_into().map_err(|_| {
            ChainError::MalformedNonce(format!("expected 32 bytes, got {}", slice.len()))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for ChainNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainNonce({})", &self.to_hex()[..8])
    }
}

impl AsRef<[u8]> for ChainNonce {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_hex_roundtrip() {
        let digest = Digest::from_bytes([0x42; 32]);
        let recovered = Digest::from_hex(&digest.to_hex()).unwrap();
        assert_eq!(digest, recovered);
    }

    #[test]
    fn test_digest_from_hex_rejects_short_input() {
        assert!(Digest::from_hex("abcd").is_err());
    }

    #[test]
    fn test_hash_concat_matches_hash_of_concatenation() {
        let joined = Digest::hash(b"leftright");
        let parts = Digest::hash_concat(&[b"left".as_slice(), b"right".as_slice()]);
        assert_eq!(joined, parts);
    }

    #[test]
    fn test_digest_display_and_prefix() {
        let digest = Digest::from_bytes([0xab; 32]);
        assert_eq!(format!("{}", digest), "abababababababab");
        assert_eq!(digest.prefix_hex(16).len(), 32);
        assert_eq!(digest.prefix_hex(64).len(), 64);
    }

    #[test]
    fn test_nonce_from_slice() {
        let nonce = ChainNonce::generate();
        assert_eq!(ChainNonce::from_slice(nonce.as_bytes()).unwrap(), nonce);
        assert!(matches!(
            ChainNonce::from_slice(&[0u8; 31]),
            Err(ChainError::MalformedNonce(_))
        ));
    }

    #[test]
    fn test_generated_nonces_differ() {
        assert_ne!(ChainNonce::generate(), ChainNonce::generate());
    }
}
