//! Full-mesh channel registry over a fixed roster.
//!
//! One [`RatchetChannel`] per unordered pair of roster members, so a roster of
//! N participants never holds more than N·(N−1)/2 channels. Each channel sits
//! behind its own mutex; a send on one pair never waits on another pair.
//!
//! Lock order is registry map, then channel, then seal chain. The map lock is
//! released before a channel is locked on the send path.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use simplex_core::HashChainSeal;
use tracing::debug;

use crate::channel::{ChannelStatus, Endpoints, MessageRecord, RatchetChannel, Received, DEFAULT_HISTORY_LIMIT};
use crate::error::RegistryError;

/// The roster used when none is configured.
pub const DEFAULT_ROSTER: [&str; 5] = ["leonardo", "nyx", "zoe", "euterpe", "omniscient"];

/// Topology label reported by [`ChannelRegistry::status`].
pub const TOPOLOGY: &str = "full_mesh";

/// Shared, individually locked channel.
pub type ChannelHandle = Arc<Mutex<RatchetChannel>>;

/// Registry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshConfig {
    /// Participants, in broadcast order. Duplicates are ignored.
    pub roster: Vec<String>,
    /// Open every channel up front instead of on first use.
    pub eager: bool,
    /// History bound for each channel.
    pub history_limit: usize,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            roster: DEFAULT_ROSTER.iter().map(|s| s.to_string()).collect(),
            eager: true,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl MeshConfig {
    /// Config with the given roster and default settings otherwise.
    pub fn with_roster<I, S>(roster: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roster: roster.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// Aggregate view of the mesh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshStatus {
    pub channels: usize,
    pub topology: String,
    pub total_messages: usize,
    pub total_ratchets: u64,
    pub daemons: Vec<String>,
    pub channels_status: Vec<ChannelStatus>,
}

/// Owns every channel of the roster and the seal chain they share.
pub struct ChannelRegistry {
    roster: Vec<String>,
    history_limit: usize,
    seal: Arc<HashChainSeal>,
    channels: RwLock<BTreeMap<Endpoints, ChannelHandle>>,
}

impl ChannelRegistry {
    /// Create a registry sealing into `seal`.
    pub fn new(seal: Arc<HashChainSeal>, config: MeshConfig) -> Self {
        let mut roster: Vec<String> = Vec::with_capacity(config.roster.len());
        for name in config.roster {
            if !roster.contains(&name) {
                roster.push(name);
            }
        }

        let mut channels = BTreeMap::new();
        if config.eager {
            for (i, a) in roster.iter().enumerate() {
                for b in &roster[i + 1..] {
                    let channel =
                        RatchetChannel::with_history_limit(a, b, seal.clone(), config.history_limit);
                    channels.insert(channel.endpoints().clone(), Arc::new(Mutex::new(channel)));
                }
            }
        }

        debug!(participants = roster.len(), channels = channels.len(), "mesh initialized");

        Self {
            roster,
            history_limit: config.history_limit,
            seal,
            channels: RwLock::new(channels),
        }
    }

    /// Roster, in broadcast order.
    pub fn participants(&self) -> &[String] {
        &self.roster
    }

    /// The seal chain every channel writes to.
    pub fn seal(&self) -> &Arc<HashChainSeal> {
        &self.seal
    }

    /// Number of open channels.
    pub fn len(&self) -> usize {
        self.channels.read().len()
    }

    /// True if no channel is open.
    pub fn is_empty(&self) -> bool {
        self.channels.read().is_empty()
    }

    /// The channel between `a` and `b`, opened on first use.
    ///
    /// Order does not matter. Concurrent callers for the same pair get the
    /// same channel.
    pub fn get_channel(&self, a: &str, b: &str) -> Result<ChannelHandle, RegistryError> {
        if a == b {
            return Err(RegistryError::SelfChannel(a.to_string()));
        }
        for name in [a, b] {
            if !self.roster.iter().any(|member| member == name) {
                return Err(RegistryError::UnknownParticipant(name.to_string()));
            }
        }

        let endpoints = Endpoints::new(a, b);
        if let Some(handle) = self.channels.read().get(&endpoints) {
            return Ok(handle.clone());
        }

        let mut channels = self.channels.write();
        let handle = channels.entry(endpoints).or_insert_with_key(|endpoints| {
            debug!(channel = %endpoints, "opening channel");
            let (low, high) = endpoints.pair();
            Arc::new(Mutex::new(RatchetChannel::with_history_limit(
                low,
                high,
                self.seal.clone(),
                self.history_limit,
            )))
        });
        Ok(handle.clone())
    }

    /// Send `content` from `sender` to `receiver`.
    pub fn send(&self, sender: &str, receiver: &str, content: &str) -> Result<MessageRecord, RegistryError> {
        let channel = self.get_channel(sender, receiver)?;
        let record = channel.lock().send(sender, content)?;
        Ok(record)
    }

    /// Send `content` from `sender` to every other roster member, in roster order.
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

    /// Receive on the channel between `a` and `b`.
    pub fn receive(
        &self,
        a: &str,
        b: &str,
        ciphertext_hex: &str,
        tag_hex: &str,
    ) -> Result<Received, RegistryError> {
        let channel = self.get_channel(a, b)?;
        let received = channel.lock().receive(ciphertext_hex, tag_hex)?;
        Ok(received)
    }

    /// Aggregate status across all open channels, ordered by channel label.
    pub fn status(&self) -> MeshStatus {
        let channels = self.channels.read();
        let channels_status: Vec<ChannelStatus> =
            channels.values().map(|channel| channel.lock().status()).collect();

        MeshStatus {
            channels: channels.len(),
            topology: TOPOLOGY.to_string(),
            total_messages: channels_status.iter().map(|s| s.messages_count).sum(),
            total_ratchets: channels_status.iter().map(|s| s.ratchet_count).sum(),
            daemons: self.roster.clone(),
            channels_status,
        }
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("roster", &self.roster)
            .field("channels", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn registry(roster: &[&str], eager: bool) -> ChannelRegistry {
        let mut config = MeshConfig::with_roster(roster.iter().copied());
        config.eager = eager;
        ChannelRegistry::new(Arc::new(HashChainSeal::new()), config)
    }

    #[test]
    fn test_default_roster_full_mesh() {
        let registry = ChannelRegistry::new(Arc::new(HashChainSeal::new()), MeshConfig::default());
        assert_eq!(registry.len(), 10);
        assert_eq!(registry.participants().len(), 5);
    }

    #[test]
    fn test_broadcast_scenario() {
        let registry = registry(&["a", "b", "c"], true);
        let records = registry.broadcast("a", "hello").unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].receiver, "b");
        assert_eq!(records[1].receiver, "c");

        let status = registry.status();
        assert_eq!(status.channels, 3);
        assert_eq!(status.topology, "full_mesh");
        assert_eq!(status.total_messages, 2);
        assert_eq!(status.total_ratchets, 2);
        assert_eq!(status.daemons, vec!["a", "b", "c"]);

        let ab = registry.get_channel("a", "b").unwrap();
        assert_eq!(ab.lock().ratchet_count(), 1);
        let bc = registry.get_channel("c", "b").unwrap();
        assert_eq!(bc.lock().ratchet_count(), 0);
    }

    #[test]
    fn test_lazy_mesh_opens_on_demand() {
        let registry = registry(&["a", "b", "c"], false);
        assert!(registry.is_empty());

        registry.send("a", "b", "hi").unwrap();
        assert_eq!(registry.len(), 1);
        registry.send("b", "a", "hi back").unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_channel("a", "b").unwrap().lock().ratchet_count(), 2);
    }

    #[test]
    fn test_get_channel_is_idempotent_and_unordered() {
        let registry = registry(&["a", "b"], false);
        let h1 = registry.get_channel("a", "b").unwrap();
        let h2 = registry.get_channel("b", "a").unwrap();
        assert!(Arc::ptr_eq(&h1, &h2));
    }

    #[test]
    fn test_rejects_self_and_strangers() {
        let registry = registry(&["a", "b"], true);
        assert!(matches!(
            registry.get_channel("a", "a"),
            Err(RegistryError::SelfChannel(_))
        ));
        assert!(matches!(
            registry.send("a", "mallory", "hi"),
            Err(RegistryError::UnknownParticipant(name)) if name == "mallory"
        ));
        assert!(matches!(
            registry.broadcast("mallory", "hi"),
            Err(RegistryError::UnknownParticipant(_))
        ));
    }

    #[test]
    fn test_duplicate_roster_entries_collapse() {
        let registry = registry(&["a", "b", "a", "c"], true);
        assert_eq!(registry.participants(), &["a", "b", "c"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_receive_through_registry() {
        let registry = registry(&["a", "b"], true);
        let record = registry.send("a", "b", "hello").unwrap();
        // Shared state has already ratcheted past the send.
        let received = registry.receive("b", "a", &record.encrypted, &record.tag).unwrap();
        assert_eq!(received, Received::IntegrityFailure);

        let status = registry.status();
        assert_eq!(status.total_ratchets, 2);
        assert_eq!(status.total_messages, 1);
    }

    #[test]
    fn test_broadcasts_seal_in_order() {
        let registry = registry(&["a", "b", "c", "d"], true);
        let records = registry.broadcast("c", "news").unwrap();
        let positions: Vec<u64> = records.iter().map(|r| r.seal.chain_position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert_eq!(registry.seal().len(), 3);
    }

    #[test]
    fn test_concurrent_lazy_creation_yields_one_channel() {
        let registry = Arc::new(registry(&["a", "b", "c", "d"], false));
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..20 {
                        let (x, y) = if i % 2 == 0 { ("a", "d") } else { ("d", "a") };
                        registry.send(x, y, "ping").unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(registry.len(), 1);
        let channel = registry.get_channel("a", "d").unwrap();
        assert_eq!(channel.lock().ratchet_count(), 160);
        assert_eq!(registry.seal().len(), 160);
        assert!(registry.seal().audit().is_ok());
    }

    proptest! {
        #[test]
        fn prop_channel_count_is_pairs(
            n in 2usize..8,
            requests in prop::collection::vec((0usize..8, 0usize..8), 0..64),
        ) {
            let names: Vec<String> = (0..n).map(|i| format!("p{}", i)).collect();
            let registry = ChannelRegistry::new(
                Arc::new(HashChainSeal::new()),
                MeshConfig { roster: names.clone(), eager: false, history_limit: 4 },
            );

            for (x, y) in requests {
                let (x, y) = (x % n, y % n);
                let _ = registry.get_channel(&names[x], &names[y]);
            }
            for i in 0..n {
                for j in 0..n {
                    let _ = registry.get_channel(&names[i], &names[j]);
                }
            }
            prop_assert_eq!(registry.len(), n * (n - 1) / 2);
        }
    }
}
