//! Binary Merkle tree over an ordered list of byte-string leaves.
//!
//! Level 0 holds `H(leaf)` for every leaf; level k+1 holds `H(left || right)`
//! for each pair of level k. A level with an odd count pairs its last node with
//! itself. Changing that convention changes every root, so it is fixed here.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::types::Digest;

/// Marker hashed to produce the root of an empty tree.
const EMPTY_MARKER: &[u8] = b"empty";

/// The root reported by a tree with no leaves.
pub fn empty_root() -> Digest {
    Digest::hash(EMPTY_MARKER)
}

/// Which side of the running hash a sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// The sibling is to the left.
    Left,
    /// The sibling is to the right.
    Right,
}

/// One level of an inclusion proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling: Digest,
    pub side: Side,
}

/// Sibling digests from a leaf up to the root.
///
/// A proof is tied to the tree as it was when generated. Any later
/// [`MerkleTree::add_leaf`] changes the root, and the proof must be regenerated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    pub steps: Vec<ProofStep>,
}

impl InclusionProof {
    /// Number of levels the proof climbs.
    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    /// True when the proof carries no steps.
    ///
    /// This is either "no proof available" (index out of range) or the proof
    /// for the only leaf of a one-leaf tree.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Fold `leaf` through the proof and return the implied root.
    pub fn compute_root(&self, leaf: &[u8]) -> Digest {
        self.steps
            .iter()
            .fold(Digest::hash(leaf), |current, step| match step.side {
                Side::Left => hash_node(&step.sibling, &current),
                Side::Right => hash_node(&current, &step.sibling),
            })
    }
}

fn hash_node(left: &Digest, right: &Digest) -> Digest {
    Digest::hash_concat(&[left.as_bytes().as_slice(), right.as_bytes().as_slice()])
}

/// A Merkle tree rebuilt in full on every append.
#[derive(Debug, Clone, Default)]
pub struct MerkleTree {
    leaves: Vec<Bytes>,
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tree over an initial list of leaves.
    pub fn from_leaves<I, L>(leaves: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Bytes>,
    {
        let mut tree = Self {
            leaves: leaves.into_iter().map(Into::into).collect(),
            levels: Vec::new(),
        };
        tree.build();
        tree
    }

    /// Append a leaf and rebuild all levels.
    pub fn add_leaf(&mut self, data: impl Into<Bytes>) {
        self.leaves.push(data.into());
        self.build();
    }

    /// The root digest, or [`empty_root`] when there are no leaves.
    pub fn root(&self) -> Digest {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or_else(empty_root)
    }

    /// Inclusion proof for the leaf at `index`.
    ///
    /// An index outside `[0, len)` yields an empty proof rather than an error.
    /// Callers that need to tell that apart from a one-leaf tree must check
    /// [`MerkleTree::len`] first.
    pub fn proof(&self, index: usize) -> InclusionProof {
        if index >= self.leaves.len() {
            return InclusionProof::default();
        }

        let mut steps = Vec::with_capacity(self.depth());
        let mut pos = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let step = if pos % 2 == 0 {
                // Last node of an odd level is its own sibling.
                let sibling = level.get(pos + 1).unwrap_or(&level[pos]);
                ProofStep {
                    sibling: *sibling,
                    side: Side::Right,
                }
            } else {
                ProofStep {
                    sibling: level[pos - 1],
                    side: Side::Left,
                }
            };
            steps.push(step);
            pos /= 2;
        }

        InclusionProof { steps }
    }

    /// Check that `leaf` at `index` folds through `proof` to the current root.
    pub fn verify(&self, leaf: &[u8], index: usize, proof: &InclusionProof) -> bool {
        if index >= self.leaves.len() {
            return false;
        }
        proof.compute_root(leaf) == self.root()
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// True if the tree has no leaves.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// All leaves in insertion order.
    pub fn leaves(&self) -> &[Bytes] {
        &self.leaves
    }

    /// The leaf at `index`, if any.
    pub fn leaf(&self, index: usize) -> Option<&Bytes> {
        self.leaves.get(index)
    }

    /// Number of levels above the leaf hashes (the proof depth of every leaf).
    pub fn depth(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    fn build(&mut self) {
        self.levels.clear();
        if self.leaves.is_empty() {
            return;
        }

        let mut level: Vec<Digest> = self.leaves.iter().map(|l| Digest::hash(l)).collect();
        while level.len() > 1 {
            let next: Vec<Digest> = level
                .chunks(2)
                .map(|pair| hash_node(&pair[0], pair.get(1).unwrap_or(&pair[0])))
                .collect();
            self.levels.push(level);
            level = next;
        }
        self.levels.push(level);
    }
}
