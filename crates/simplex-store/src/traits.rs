//! Store trait: the abstract interface for seal chain persistence.
//!
//! A store holds exactly one chain: its nonce and its seals keyed by
//! 1-indexed chain position. Implementations include SQLite (primary) and
//! in-memory (for tests).

use async_trait::async_trait;
use bytes::Bytes;
use simplex_core::{ChainEntry, ChainNonce, Digest};

use crate::error::Result;

/// Result of appending a seal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendResult {
    /// Seal was stored.
    Appended,
    /// The identical seal is already stored (idempotent, not an error).
    AlreadyExists,
    /// A different seal is stored at this position.
    Conflict {
        /// Link of the seal already stored there.
        existing: Digest,
    },
}

/// One persisted seal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSeal {
    /// 1-indexed chain position.
    pub position: u64,
    pub link: Digest,
    pub payload: Bytes,
}

impl From<StoredSeal> for ChainEntry {
    fn from(seal: StoredSeal) -> Self {
        ChainEntry {
            link: seal.link,
            payload: seal.payload,
        }
    }
}

/// Async interface for seal chain persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// SQLite work runs under `spawn_blocking` so it never stalls the runtime.
///
/// # Contract
///
/// - **Contiguous positions**: appending position `p > 1` requires `p - 1` to
///   be stored already; a gap is [`StoreError::InvalidData`](crate::StoreError::InvalidData).
/// - **Idempotent appends**: the same `(position, link, payload)` twice
///   returns `AlreadyExists`.
/// - **Conflict detection**: a different seal at a stored position returns
///   `Conflict` with the stored link.
/// - **One nonce**: saving the same nonce twice is a no-op; saving a
///   different one is `InvalidData`.
#[async_trait]
pub trait Store: Send + Sync {
    /// Record the chain nonce.
    async fn save_nonce(&self, nonce: &ChainNonce) -> Result<()>;

    /// The recorded chain nonce, if any.
    async fn load_nonce(&self) -> Result<Option<ChainNonce>>;

    /// Append the seal at `position`.
    async fn append_seal(&self, position: u64, link: &Digest, payload: &[u8]) -> Result<AppendResult>;

    /// Every stored seal, ordered by position.
    async fn load_seals(&self) -> Result<Vec<StoredSeal>>;

    /// Number of stored seals (equivalently, the highest stored position).
    async fn seal_count(&self) -> Result<u64>;
}
