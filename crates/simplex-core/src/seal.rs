//! The hash-chain seal: every payload crossing a channel is stamped here.
//!
//! Each seal appends one link to the chain and one leaf to the Merkle tree,
//! under a single lock, so `links.len() == merkle.len()` is never observed
//! broken.
//!
//! ```text
//! payload   = nonce || timestamp || "{sender}→{receiver}" || data
//! genesis   = trinity(nonce)
//! link[i]   = trinity(link[i-1] || trinity(payload[i]))     (link[-1] = genesis)
//! ```
//!
//! Without an external anchor the chain only proves consistency with itself.

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ChainError, Result};
use crate::hash::trinity_digest;
use crate::merkle::{InclusionProof, MerkleTree};
use crate::types::{ChainNonce, Digest};

/// Bytes of a digest shown in a [`Seal`] (rendered as twice as many hex chars).
pub const SEAL_PREFIX_BYTES: usize = 16;

/// Bytes of the Merkle root shown in a [`SealStatus`].
const STATUS_ROOT_BYTES: usize = 8;

/// Summary of one sealed payload. Read-only once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seal {
    /// Hex prefix of the payload's trinity digest.
    pub seal: String,
    /// 1-indexed position in the chain.
    pub chain_position: u64,
    /// Hex prefix of the Merkle root right after this seal.
    pub merkle_root: String,
    /// Length of the inclusion proof for this payload.
    pub proof_depth: usize,
    /// RFC 3339 timestamp embedded in the payload.
    pub timestamp: String,
    /// Whether the fresh inclusion proof verified against the new root.
    pub verified: bool,
}

/// Overall state of a seal chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealStatus {
    pub chain_length: usize,
    pub merkle_leaves: usize,
    pub merkle_root: String,
    pub integrity: bool,
}

/// One link of the chain with the payload it sealed, in append order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEntry {
    pub link: Digest,
    pub payload: Bytes,
}

/// The link that follows `prev` when sealing `payload`.
pub fn next_link(prev: &Digest, payload: &[u8]) -> Digest {
    link_from(prev, &trinity_digest(payload))
}

fn link_from(prev: &Digest, trinity: &Digest) -> Digest {
    let mut joined = [0u8; Digest::LEN * 2];
    joined[..Digest::LEN].copy_from_slice(prev.as_bytes());
    joined[Digest::LEN..].copy_from_slice(trinity.as_bytes());
    trinity_digest(&joined)
}

fn compose_payload(
    nonce: &ChainNonce,
    timestamp: &str,
    sender: &str,
    receiver: &str,
    data: &[u8],
) -> Bytes {
    let context = format!("{}→{}", sender, receiver);
    let mut payload =
        Vec::with_capacity(ChainNonce::LEN + timestamp.len() + context.len() + data.len());
    payload.extend_from_slice(nonce.as_bytes());
    payload.extend_from_slice(timestamp.as_bytes());
    payload.extend_from_slice(context.as_bytes());
    payload.extend_from_slice(data);
    Bytes::from(payload)
}

#[derive(Debug, Default)]
struct ChainState {
    links: Vec<Digest>,
    merkle: MerkleTree,
}

/// Append-only chain of seals backed by a Merkle tree.
///
/// Shared between channels behind an `Arc`; every method takes `&self`.
#[derive(Debug)]
pub struct HashChainSeal {
    nonce: ChainNonce,
    genesis: Digest,
    state: Mutex<ChainState>,
}

impl HashChainSeal {
    /// Create an empty chain with a fresh random nonce.
    pub fn new() -> Self {
        Self::with_nonce(ChainNonce::generate())
    }

    /// Create an empty chain with a known nonce.
    pub fn with_nonce(nonce: ChainNonce) -> Self {
        Self {
            nonce,
            genesis: trinity_digest(nonce.as_bytes()),
            state: Mutex::new(ChainState::default()),
        }
    }

    /// Rebuild a chain from entries stored in append order.
    ///
    /// The Merkle tree is rebuilt from the payloads and every link is
    /// recomputed; any divergence rejects the whole chain.
    pub fn restore<I>(nonce: ChainNonce, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = ChainEntry>,
    {
        let (links, payloads): (Vec<Digest>, Vec<Bytes>) = entries
            .into_iter()
            .map(|entry| (entry.link, entry.payload))
            .unzip();

        let chain = Self::with_nonce(nonce);
        {
            let mut state = chain.state.lock();
            state.merkle = MerkleTree::from_leaves(payloads);
            state.links = links;
        }
        chain.audit()?;

        debug!(length = chain.len(), "restored seal chain");
        Ok(chain)
    }

    /// The chain's nonce.
    pub fn nonce(&self) -> &ChainNonce {
        &self.nonce
    }

    /// The digest the first link is chained from.
    pub fn genesis(&self) -> Digest {
        self.genesis
    }

    /// Seal `data` sent from `sender` to `receiver`, stamped with the current time.
    pub fn seal(&self, data: &[u8], sender: &str, receiver: &str) -> Seal {
        self.seal_at(data, sender, receiver, Utc::now())
    }

    /// Seal `data` with an explicit timestamp.
    pub fn seal_at(&self, data: &[u8], sender: &str, receiver: &str, at: DateTime<Utc>) -> Seal {
        let timestamp = at.to_rfc3339_opts(SecondsFormat::Micros, true);
        let payload = compose_payload(&self.nonce, &timestamp, sender, receiver, data);
        let trinity = trinity_digest(&payload);

        let mut state = self.state.lock();
        let prev = state.links.last().copied().unwrap_or(self.genesis);
        state.links.push(link_from(&prev, &trinity));
        state.merkle.add_leaf(payload.clone());

        let index = state.merkle.len() - 1;
        let proof = state.merkle.proof(index);
        let verified = state.merkle.verify(&payload, index, &proof);
        let chain_position = state.links.len() as u64;
        let root = state.merkle.root();
        drop(state);

        debug!(
            chain_position,
            sender,
            receiver,
            proof_depth = proof.depth(),
            "sealed payload"
        );

        Seal {
            seal: trinity.prefix_hex(SEAL_PREFIX_BYTES),
            chain_position,
            merkle_root: root.prefix_hex(SEAL_PREFIX_BYTES),
            proof_depth: proof.depth(),
            timestamp,
            verified,
        }
    }

    /// Structural sanity check: the chain is non-empty and every link has a
    /// Merkle leaf. This is not proof of non-tampering.
    pub fn verify_chain(&self) -> bool {
        let state = self.state.lock();
        !state.links.is_empty() && state.links.len() == state.merkle.len()
    }

    /// Recompute every link from the stored payloads.
    ///
    /// Returns the first position (1-indexed) that does not reproduce.
    pub fn audit(&self) -> Result<()> {
        let state = self.state.lock();
        if state.links.len() != state.merkle.len() {
            return Err(ChainError::LengthMismatch {
                links: state.links.len(),
                leaves: state.merkle.len(),
            });
        }

        let mut prev = self.genesis;
        for (i, (link, payload)) in state.links.iter().zip(state.merkle.leaves()).enumerate() {
            let position = i as u64 + 1;
            if !payload.starts_with(self.nonce.as_bytes()) {
                warn!(position, "sealed payload does not carry the chain nonce");
                return Err(ChainError::NonceMismatch { position });
            }

            let expected = next_link(&prev, payload);
            if expected != *link {
                warn!(position, "seal chain link does not reproduce");
                return Err(ChainError::BrokenLink {
                    position,
                    expected: expected.to_hex(),
                    actual: link.to_hex(),
                });
            }
            prev = *link;
        }
        Ok(())
    }

    /// Current state summary.
    pub fn status(&self) -> SealStatus {
        let state = self.state.lock();
        SealStatus {
            chain_length: state.links.len(),
            merkle_leaves: state.merkle.len(),
            merkle_root: format!("{}...", state.merkle.root().prefix_hex(STATUS_ROOT_BYTES)),
            integrity: !state.links.is_empty() && state.links.len() == state.merkle.len(),
        }
    }

    /// Number of seals.
    pub fn len(&self) -> usize {
        self.state.lock().links.len()
    }

    /// True if nothing has been sealed yet.
    pub fn is_empty(&self) -> bool {
        self.state.lock().links.is_empty()
    }

    /// The latest link, if any.
    pub fn head(&self) -> Option<Digest> {
        self.state.lock().links.last().copied()
    }

    /// All links in append order.
    pub fn links(&self) -> Vec<Digest> {
        self.state.lock().links.clone()
    }

    /// Root of the internal Merkle tree.
    pub fn merkle_root(&self) -> Digest {
        self.state.lock().merkle.root()
    }

    /// All entries in append order.
    pub fn entries(&self) -> Vec<ChainEntry> {
        self.entries_from(0)
    }

    /// Entries starting at 0-indexed `start`, in append order.
    pub fn entries_from(&self, start: usize) -> Vec<ChainEntry> {
        let state = self.state.lock();
        state
            .links
            .iter()
            .zip(state.merkle.leaves())
            .skip(start)
            .map(|(link, payload)| ChainEntry {
                link: *link,
                payload: payload.clone(),
            })
            .collect()
    }

    /// The payload at 0-indexed `index` with a proof against the current root.
    pub fn inclusion(&self, index: usize) -> Option<(Bytes, InclusionProof)> {
        let state = self.state.lock();
        let payload = state.merkle.leaf(index)?.clone();
        Some((payload, state.merkle.proof(index)))
    }

    /// Verify an inclusion proof against the current root.
    pub fn verify_inclusion(&self, payload: &[u8], index: usize, proof: &InclusionProof) -> bool {
        self.state.lock().merkle.verify(payload, index, proof)
    }
}

impl Default for HashChainSeal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, 15, 9, 26).unwrap()
    }

    fn chain() -> HashChainSeal {
        HashChainSeal::with_nonce(ChainNonce::from_bytes([7; 32]))
    }

    #[test]
    fn test_new_chain_is_empty() {
        let chain = chain();
        assert!(chain.is_empty());
        assert!(!chain.verify_chain());
        assert_eq!(chain.head(), None);
        assert!(chain.audit().is_ok());
        assert_eq!(chain.genesis(), trinity_digest(&[7; 32]));
    }

    #[test]
    fn test_seal_summary_fields() {
        let chain = chain();
        let seal = chain.seal_at(b"payload", "leonardo", "nyx", fixed_time());

        assert_eq!(seal.chain_position, 1);
        assert_eq!(seal.seal.len(), SEAL_PREFIX_BYTES * 2);
        assert_eq!(seal.merkle_root.len(), SEAL_PREFIX_BYTES * 2);
        assert_eq!(seal.proof_depth, 0);
        assert_eq!(seal.timestamp, "2024-03-14T15:09:26.000000Z");
        assert!(seal.verified);
        assert_eq!(seal.merkle_root, chain.merkle_root().prefix_hex(SEAL_PREFIX_BYTES));
    }

    #[test]
    fn test_payload_layout() {
        let chain = chain();
        chain.seal_at(b"data", "a", "b", fixed_time());
        let entry = &chain.entries()[0];

        let mut expected = vec![7u8; 32];
        expected.extend_from_slice(b"2024-03-14T15:09:26.000000Z");
        expected.extend_from_slice("a→b".as_bytes());
        expected.extend_from_slice(b"data");
        assert_eq!(entry.payload.as_ref(), expected.as_slice());
    }

    #[test]
    fn test_first_link_chains_from_genesis() {
        let chain = chain();
        chain.seal_at(b"first", "a", "b", fixed_time());
        let entry = &chain.entries()[0];
        assert_eq!(entry.link, next_link(&chain.genesis(), &entry.payload));
    }

    #[test]
    fn test_proof_depth_grows_with_chain() {
        let chain = chain();
        let depths: Vec<usize> = (0..5)
            .map(|i| chain.seal_at(&[i], "a", "b", fixed_time()).proof_depth)
            .collect();
        assert_eq!(depths, vec![0, 1, 2, 2, 3]);
    }

    #[test]
    fn test_status() {
        let chain = chain();
        assert!(!chain.status().integrity);
        chain.seal(b"x", "a", "b");
        chain.seal(b"y", "b", "a");

        let status = chain.status();
        assert_eq!(status.chain_length, 2);
        assert_eq!(status.merkle_leaves, 2);
        assert!(status.merkle_root.ends_with("..."));
        assert!(status.integrity);
    }

    #[test]
    fn test_inclusion_after_later_seals() {
        let chain = chain();
        for i in 0..6u8 {
            chain.seal_at(&[i], "a", "b", fixed_time());
        }
        let (payload, proof) = chain.inclusion(2).unwrap();
        assert!(chain.verify_inclusion(&payload, 2, &proof));
        assert!(chain.inclusion(6).is_none());
    }

    #[test]
    fn test_restore_roundtrip() {
        let original = chain();
        for i in 0..5u8 {
            original.seal_at(&[i; 3], "zoe", "nyx", fixed_time());
        }

        let restored = HashChainSeal::restore(*original.nonce(), original.entries()).unwrap();
        assert_eq!(restored.links(), original.links());
        assert_eq!(restored.merkle_root(), original.merkle_root());

        // Appending continues the same chain.
        let a = original.seal_at(b"next", "zoe", "nyx", fixed_time());
        let b = restored.seal_at(b"next", "zoe", "nyx", fixed_time());
        assert_eq!(a, b);
        assert_eq!(original.head(), restored.head());
    }

    #[test]
    fn test_restore_rejects_tampered_payload() {
        let original = chain();
        for i in 0..4u8 {
            original.seal_at(&[i], "a", "b", fixed_time());
        }
        let mut entries = original.entries();
        let mut tampered = entries[2].payload.to_vec();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;
        entries[2].payload = Bytes::from(tampered);

        let err = HashChainSeal::restore(*original.nonce(), entries).unwrap_err();
        assert!(matches!(err, ChainError::BrokenLink { position: 3, .. }));
    }

    #[test]
    fn test_restore_rejects_reordered_entries() {
        let original = chain();
        for i in 0..3u8 {
            original.seal_at(&[i], "a", "b", fixed_time());
        }
        let mut entries = original.entries();
        entries.swap(0, 1);

        let err = HashChainSeal::restore(*original.nonce(), entries).unwrap_err();
        assert!(matches!(err, ChainError::BrokenLink { position: 1, .. }));
    }

    #[test]
    fn test_restore_rejects_foreign_nonce() {
        let original = chain();
        original.seal_at(b"x", "a", "b", fixed_time());

        let err = HashChainSeal::restore(ChainNonce::from_bytes([9; 32]), original.entries())
            .unwrap_err();
        assert_eq!(err, ChainError::NonceMismatch { position: 1 });
    }

    #[test]
    fn test_seal_serializes_with_expected_keys() {
        let seal = chain().seal_at(b"x", "a", "b", fixed_time());
        let json = serde_json::to_value(&seal).unwrap();
        for key in [
            "seal",
            "chain_position",
            "merkle_root",
            "proof_depth",
            "timestamp",
            "verified",
        ] {
            assert!(json.get(key).is_some(), "missing key {}", key);
        }
    }

    proptest! {
        #[test]
        fn prop_chain_length_matches_leaves(messages in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..24)) {
            let chain = HashChainSeal::new();
            for (i, data) in messages.iter().enumerate() {
                let seal = chain.seal(data, "a", "b");
                prop_assert_eq!(seal.chain_position, i as u64 + 1);
            }
            let status = chain.status();
            prop_assert_eq!(status.chain_length, messages.len());
            prop_assert_eq!(status.merkle_leaves, messages.len());
        }

        #[test]
        fn prop_links_recompute_from_payloads(messages in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 2..16)) {
            let chain = HashChainSeal::new();
            for data in &messages {
                chain.seal(data, "sender", "receiver");
            }
            let mut prev = chain.genesis();
            for entry in chain.entries() {
                prop_assert_eq!(entry.link, next_link(&prev, &entry.payload));
                prev = entry.link;
            }
            prop_assert!(chain.audit().is_ok());
        }
    }
}
