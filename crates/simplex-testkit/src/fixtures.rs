//! Test fixtures and helpers.
//!
//! Common setup code for integration tests. Everything here is deterministic:
//! a fixed chain nonce and timestamps derived from chain position.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use simplex::{Simplex, SimplexConfig};
use simplex_channel::{ChannelRegistry, MeshConfig, MessageRecord, RegistryError};
use simplex_core::{ChainNonce, HashChainSeal};
use simplex_store::MemoryStore;

/// Nonce used by every fixture chain.
pub const FIXTURE_NONCE: [u8; 32] = [0x5a; 32];

/// The instant fixture timestamps count from.
pub fn fixed_time() -> DateTime<Utc> {
    Utc.timestamp_opt(1_704_067_200, 0).single().unwrap_or_default()
}

/// Roster of `count` participants named `p0`, `p1`, ...
pub fn roster_of(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("p{}", i)).collect()
}

/// A shared chain and a full mesh over a small roster.
pub struct TestFixture {
    pub roster: Vec<String>,
    pub seal: Arc<HashChainSeal>,
    pub registry: ChannelRegistry,
}

impl TestFixture {
    /// Roster `a`, `b`, `c` over a chain with [`FIXTURE_NONCE`].
    pub fn new() -> Self {
        Self::with_roster(["a", "b", "c"])
    }

    /// Custom roster over a chain with [`FIXTURE_NONCE`].
    pub fn with_roster<I, S>(roster: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_mesh(MeshConfig::with_roster(roster))
    }

    /// Custom roster with channels opened on first use.
    pub fn with_roster_lazy<I, S>(roster: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_mesh(MeshConfig {
            eager: false,
            ..MeshConfig::with_roster(roster)
        })
    }

    /// Any mesh configuration over a chain with [`FIXTURE_NONCE`].
    pub fn with_mesh(config: MeshConfig) -> Self {
        let seal = Arc::new(HashChainSeal::with_nonce(ChainNonce::from_bytes(FIXTURE_NONCE)));
        let registry = ChannelRegistry::new(seal.clone(), config);
        Self {
            roster: registry.participants().to_vec(),
            seal,
            registry,
        }
    }

    /// Config for a [`simplex::Simplex`] over the same roster.
    pub fn config(&self) -> SimplexConfig {
        SimplexConfig {
            roster: self.roster.clone(),
            ..SimplexConfig::default()
        }
    }

    /// A fresh in-memory [`Simplex`] over the same roster.
    ///
    /// The network has its own chain; it shares nothing with this fixture.
    pub fn network(&self) -> Simplex<MemoryStore> {
        Simplex::new(MemoryStore::new(), self.config())
    }

    /// Timestamp of the next seal: one second per chain position.
    pub fn next_time(&self) -> DateTime<Utc> {
        fixed_time() + Duration::seconds(self.seal.len() as i64)
    }

    /// Send with a deterministic timestamp.
    pub fn send(&self, sender: &str, receiver: &str, content: &str) -> Result<MessageRecord, RegistryError> {
        let channel = self.registry.get_channel(sender, receiver)?;
        let mut channel = channel.lock();
        let at = self.next_time();
        Ok(channel.send_at(sender, content, at)?)
    }

    /// Broadcast in roster order with deterministic timestamps.
    pub fn broadcast(&self, sender: &str, content: &str) -> Result<Vec<MessageRecord>, RegistryError> {
        if !self.roster.iter().any(|member| member == sender) {
            return Err(RegistryError::UnknownParticipant(sender.to_string()));
        }
        self.roster
            .iter()
            .filter(|member| member.as_str() != sender)
            .map(|receiver| self.send(sender, receiver, content))
            .collect()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// An in-memory [`Simplex`] over `roster`, saving after every send.
pub fn memory_network<I, S>(roster: I) -> Simplex<MemoryStore>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let config = SimplexConfig {
        roster: roster.into_iter().map(Into::into).collect(),
        persist_on_send: true,
        ..SimplexConfig::default()
    };
    Simplex::new(MemoryStore::new(), config)
}

/// A standalone chain with `count` deterministic seals from `a` to `b`.
pub fn sealed_chain(count: usize) -> HashChainSeal {
    let chain = HashChainSeal::with_nonce(ChainNonce::from_bytes(FIXTURE_NONCE));
    for i in 0..count {
        let at = fixed_time() + Duration::seconds(i as i64);
        chain.seal_at(format!("message {}", i).as_bytes(), "a", "b", at);
    }
    chain
}
