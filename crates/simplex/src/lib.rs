//! # Simplex
//!
//! A secure-channel network simulation: a fixed roster of named participants,
//! a ratcheted channel between every pair, and one hash-chain seal stamping
//! every message that crosses the mesh.
//!
//! ## Overview
//!
//! - **Trinity hash**: BLAKE3, a BLAKE3 XOF layer, and an additive φ layer
//! - **Seal chain**: append-only linked digests with a Merkle tree of payloads
//! - **Ratchet channels**: keystream encryption with a truncated tag; the key
//!   advances on every send and receive
//! - **Registry**: at most one channel per unordered pair of participants
//! - **Store**: optional persistence of the seal chain (SQLite or memory)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use simplex::{Simplex, SimplexConfig};
//! use simplex::store::SqliteStore;
//!
//! async fn example() {
//!     let store = SqliteStore::open("simplex.db").unwrap();
//!     let simplex = Simplex::open(store, SimplexConfig::default()).await.unwrap();
//!
//!     let records = simplex.broadcast("leonardo", "hello").await.unwrap();
//!     assert_eq!(records.len(), 4);
//!
//!     simplex.flush().await.unwrap();
//!     println!("{:?}", simplex.status());
//! }
//! ```
//!
//! ## Not Security Infrastructure
//!
//! Channel keys derive from participant names alone, the keystream has no
//! nonce, and the seal chain has no external anchor. This is a simulation of
//! the shape of a secure network, not a secure network.
//!
//! ## Re-exports
//!
//! - `simplex::core` - Hashing, Merkle trees, and the seal chain
//! - `simplex::channel` - Ratchet channels and the registry
//! - `simplex::store` - Storage abstraction and SQLite

pub mod config;
pub mod error;
pub mod network;

// Re-export component crates
pub use simplex_channel as channel;
pub use simplex_core as core;
pub use simplex_store as store;

// Re-export main types for convenience
pub use config::SimplexConfig;
pub use error::{Result, SimplexError};
pub use network::{Simplex, SimplexStatus};

pub use simplex_channel::{
    ChannelRegistry, ChannelStatus, MeshConfig, MeshStatus, MessageRecord, RatchetChannel, Received,
};
pub use simplex_core::{
    phi_hash, trinity_digest, trinity_hex, Digest, HashChainSeal, InclusionProof, MerkleTree, Seal,
    SealStatus, PHI,
};
