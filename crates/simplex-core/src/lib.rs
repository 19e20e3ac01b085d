//! # Simplex Core
//!
//! Pure primitives for Simplex: the trinity hash, binary Merkle trees, and the
//! hash-chain seal that stamps every message crossing a channel.
//!
//! This crate contains no I/O and no networking. Everything lives in memory
//! for the lifetime of the owning object.
//!
//! ## Key Types
//!
//! - [`Digest`] - 32-byte BLAKE3 output, compared by exact byte equality
//! - [`MerkleTree`] - Binary hash tree with inclusion proofs
//! - [`HashChainSeal`] - Append-only chain of linked digests backed by a Merkle tree
//! - [`Seal`] - Summary returned for every sealed payload
//!
//! ## Not Security Infrastructure
//!
//! Every hash layer is BLAKE3, including the extendable-output layer, which
//! uses BLAKE3 derive-key mode. Digests are not interchangeable with a
//! SHA3-256/SHAKE256 trinity hash.
//!
//! None of this is post-quantum cryptography. The φ layer of the trinity hash
//! is decorative arithmetic, and the chain has no external anchor, so it only
//! detects tampering relative to a copy you already trust.

pub mod error;
pub mod hash;
pub mod merkle;
pub mod seal;
pub mod types;

pub use error::{ChainError, Result};
pub use hash::{phi_hash, trinity_digest, trinity_hex, xof_digest, PHI};
pub use merkle::{empty_root, InclusionProof, MerkleTree, ProofStep, Side};
pub use seal::{next_link, ChainEntry, HashChainSeal, Seal, SealStatus, SEAL_PREFIX_BYTES};
pub use types::{ChainNonce, Digest};
