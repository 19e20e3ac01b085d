//! # Simplex Channel
//!
//! Pairwise ratcheted channels between named participants, and a registry that
//! keeps exactly one channel per unordered pair (full-mesh topology).
//!
//! ## Overview
//!
//! - [`RatchetChannel`] - XOR keystream cipher with a truncated hash tag; the
//!   key advances on every send and every receive
//! - [`ChannelRegistry`] - owns the channels of a fixed roster and the shared
//!   [`HashChainSeal`](simplex_core::HashChainSeal) every message is sealed into
//!
//! ## Security
//!
//! This is a simulation. The initial key is derived from the public endpoint
//! names and the public constant φ, so anyone can compute it. The keystream
//! cipher falls to known-plaintext attacks if ratchet state is ever reused.
//! Do not use it to protect anything.

pub mod channel;
pub mod cipher;
pub mod error;
pub mod registry;

pub use channel::{
    ChannelStatus, Endpoints, MessageRecord, RatchetChannel, Received, DEFAULT_HISTORY_LIMIT,
    INTEGRITY_FAILURE,
};
pub use cipher::{SecretKey, TAG_LEN};
pub use error::{ChannelError, RegistryError};
pub use registry::{ChannelHandle, ChannelRegistry, MeshConfig, MeshStatus, DEFAULT_ROSTER, TOPOLOGY};
