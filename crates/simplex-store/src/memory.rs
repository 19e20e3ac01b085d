//! In-memory implementation of the Store trait.
//!
//! Same semantics as SQLite, no persistence. Primarily for tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use simplex_core::{ChainNonce, Digest};

use crate::error::{Result, StoreError};
use crate::traits::{AppendResult, Store, StoredSeal};

/// In-memory store. All data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    nonce: Option<ChainNonce>,
    /// position -> (link, payload)
    seals: BTreeMap<u64, (Digest, Bytes)>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn save_nonce(&self, nonce: &ChainNonce) -> Result<()> {
        let mut inner = self.inner.write();
        if let Some(existing) = inner.nonce {
            if existing != *nonce {
                return Err(StoreError::InvalidData(format!(
                    "store already holds chain nonce {}",
                    existing.to_hex()
                )));
            }
            return Ok(());
        }
        inner.nonce = Some(*nonce);
        Ok(())
    }

    async fn load_nonce(&self) -> Result<Option<ChainNonce>> {
        Ok(self.inner.read().nonce)
    }

    async fn append_seal(&self, position: u64, link: &Digest, payload: &[u8]) -> Result<AppendResult> {
        let mut inner = self.inner.write();

        if let Some((existing, stored)) = inner.seals.get(&position) {
            if existing == link && stored.as_ref() == payload {
                return Ok(AppendResult::AlreadyExists);
            }
            return Ok(AppendResult::Conflict { existing: *existing });
        }

        let expected = inner.seals.len() as u64 + 1;
        if position != expected {
            return Err(StoreError::InvalidData(format!(
                "seal position {} is not contiguous, next position is {}",
                position, expected
            )));
        }

        inner
            .seals
            .insert(position, (*link, Bytes::copy_from_slice(payload)));
        Ok(AppendResult::Appended)
    }

    async fn load_seals(&self) -> Result<Vec<StoredSeal>> {
        let inner = self.inner.read();
        Ok(inner
            .seals
            .iter()
            .map(|(&position, (link, payload))| StoredSeal {
                position,
                link: *link,
                payload: payload.clone(),
            })
            .collect())
    }

    async fn seal_count(&self) -> Result<u64> {
        Ok(self.inner.read().seals.len() as u64)
    }
}
