//! The Simplex network: one seal chain, one channel mesh, one store.
//!
//! Channels seal into a shared in-memory chain. The store trails the chain:
//! [`Simplex::flush`] writes every seal it has not seen yet, strictly in
//! chain order. Ratchet state is not persisted; a reopened network starts
//! every channel from its initial key and continues the restored chain.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use simplex_channel::{ChannelHandle, ChannelRegistry, MeshStatus, MessageRecord, Received};
use simplex_core::{HashChainSeal, SealStatus};
use simplex_store::{AppendResult, Store, StoreError};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::SimplexConfig;
use crate::error::Result;

/// Combined mesh and seal chain status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplexStatus {
    pub mesh: MeshStatus,
    pub seal: SealStatus,
}

/// The main Simplex struct.
///
/// Provides a unified API for:
/// - Sending and broadcasting between roster members
/// - Receiving on a channel
/// - Auditing and persisting the seal chain
pub struct Simplex<S: Store> {
    seal: Arc<HashChainSeal>,
    registry: ChannelRegistry,
    store: Arc<S>,
    config: SimplexConfig,
    /// Number of seals known to be in the store.
    persisted: Mutex<u64>,
}

impl<S: Store> Simplex<S> {
    /// Create a network with a fresh chain.
    ///
    /// Nothing is written until the first [`Simplex::flush`].
    pub fn new(store: S, config: SimplexConfig) -> Self {
        Self::assemble(Arc::new(HashChainSeal::new()), store, config, 0)
    }

    /// Open the network recorded in `store`, or start a fresh one there.
    ///
    /// A stored chain is re-audited link by link before it is trusted.
    pub async fn open(store: S, config: SimplexConfig) -> Result<Self> {
        let Some(nonce) = store.load_nonce().await? else {
            let seal = Arc::new(HashChainSeal::new());
            store.save_nonce(seal.nonce()).await?;
            debug!("started new seal chain");
            return Ok(Self::assemble(seal, store, config, 0));
        };

        let seals = store.load_seals().await?;
        for (i, stored) in seals.iter().enumerate() {
            let expected = i as u64 + 1;
            if stored.position != expected {
                return Err(StoreError::InvalidData(format!(
                    "stored seals skip position {} (found {})",
                    expected, stored.position
                ))
                .into());
            }
        }

        let persisted = seals.len() as u64;
        let seal = HashChainSeal::restore(nonce, seals.into_iter().map(Into::into)).map_err(|e| {
            warn!(error = %e, "stored seal chain failed audit");
            e
        })?;
        debug!(length = persisted, "reopened seal chain");

        Ok(Self::assemble(Arc::new(seal), store, config, persisted))
    }

    fn assemble(seal: Arc<HashChainSeal>, store: S, config: SimplexConfig, persisted: u64) -> Self {
        let registry = ChannelRegistry::new(seal.clone(), config.mesh());
        Self {
            seal,
            registry,
            store: Arc::new(store),
            config,
            persisted: Mutex::new(persisted),
        }
    }

    /// The shared seal chain.
    pub fn seal(&self) -> &Arc<HashChainSeal> {
        &self.seal
    }

    /// The channel mesh.
    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// The storage backend.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The configuration this network was built with.
    pub fn config(&self) -> &SimplexConfig {
        &self.config
    }

    /// The channel between `a` and `b`.
    pub fn channel(&self, a: &str, b: &str) -> Result<ChannelHandle> {
        Ok(self.registry.get_channel(a, b)?)
    }

    /// Send `content` from `sender` to `receiver`.
    pub async fn send(&self, sender: &str, receiver: &str, content: &str) -> Result<MessageRecord> {
        let record = self.registry.send(sender, receiver, content)?;
        if self.config.persist_on_send {
            self.flush().await?;
        }
        Ok(record)
    }

    /// Send `content` from `sender` to every other participant.
    pub async fn broadcast(&self, sender: &str, content: &str) -> Result<Vec<MessageRecord>> {
        let records = self.registry.broadcast(sender, content)?;
        if self.config.persist_on_send {
            self.flush().await?;
        }
        Ok(records)
    }

    /// Receive on the channel between `a` and `b`.
    pub fn receive(&self, a: &str, b: &str, ciphertext_hex: &str, tag_hex: &str) -> Result<Received> {
        Ok(self.registry.receive(a, b, ciphertext_hex, tag_hex)?)
    }

    /// Mesh and seal chain status.
    pub fn status(&self) -> SimplexStatus {
        SimplexStatus {
            mesh: self.registry.status(),
            seal: self.seal.status(),
        }
    }

    /// Recompute every link of the in-memory chain.
    pub fn audit(&self) -> Result<()> {
        Ok(self.seal.audit()?)
    }

    /// Write every seal the store has not seen yet. Returns how many were
    /// written.
    ///
    /// Concurrent flushes are serialized. A conflicting seal in the store
    /// stops the flush with [`StoreError::Conflict`].
    pub async fn flush(&self) -> Result<usize> {
        let mut persisted = self.persisted.lock().await;
        if *persisted == 0 {
            self.store.save_nonce(self.seal.nonce()).await?;
        }

        let pending = self.seal.entries_from(*persisted as usize);
        let mut written = 0;
        for entry in pending {
            let position = *persisted + 1;
            match self
                .store
                .append_seal(position, &entry.link, &entry.payload)
                .await?
            {
                AppendResult::Appended => written += 1,
                AppendResult::AlreadyExists => {}
                AppendResult::Conflict { existing } => {
                    warn!(position, existing = %existing, "store holds a different seal");
                    return Err(StoreError::Conflict { position }.into());
                }
            }
            *persisted = position;
        }

        if written > 0 {
            debug!(written, persisted = *persisted, "flushed seals");
        }
        Ok(written)
    }

    /// Number of seals known to be in the store.
    pub async fn persisted(&self) -> u64 {
        *self.persisted.lock().await
    }
}

impl<S: Store> std::fmt::Debug for Simplex<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simplex")
            .field("registry", &self.registry)
            .field("chain_length", &self.seal.len())
            .finish_non_exhaustive()
    }
}
