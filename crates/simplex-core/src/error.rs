//! Error types for Simplex Core.

use thiserror::Error;

/// Errors raised while auditing or restoring a seal chain.
///
/// Structural sentinels (empty proofs, the empty-tree root) are values, not
/// errors. These variants only cover chains that cannot be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("payload at position {position} does not carry the chain nonce")]
    NonceMismatch { position: u64 },

    #[error("broken link at position {position}: expected {expected}, got {actual}")]
    BrokenLink {
        position: u64,
        expected: String,
        actual: String,
    },

    #[error("chain has {links} links but {leaves} merkle leaves")]
    LengthMismatch { links: usize, leaves: usize },

    #[error("malformed nonce: {0}")]
    MalformedNonce(String),
}

/// Result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
