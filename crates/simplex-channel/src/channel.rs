//! A ratcheted channel between two named participants.
//!
//! Both simulated sides share one channel object, so there is a single key and
//! a single ratchet counter. Every send and every receive advances the ratchet:
//!
//! ```text
//! key' = H(key || (ratchet_count as u32, big-endian))
//! ratchet_count' = ratchet_count + 1
//! ```
//!
//! There is no rollback and no out-of-order handling. A ciphertext only opens
//! against the exact ratchet state it was produced under.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use simplex_core::{HashChainSeal, Seal, PHI};
use tracing::{debug, warn};

use crate::cipher::SecretKey;
use crate::error::ChannelError;

/// Records kept per channel before the oldest is evicted.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Text shown in place of plaintext when the tag does not match.
pub const INTEGRITY_FAILURE: &str = "[ERROR: integrity compromised]";

/// The unordered pair of participants a channel connects.
///
/// Stored sorted, so `Endpoints::new("b", "a") == Endpoints::new("a", "b")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Endpoints {
    low: String,
    high: String,
}

impl Endpoints {
    /// Normalize a pair of participant names.
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// Both names, sorted.
    pub fn pair(&self) -> (&str, &str) {
        (&self.low, &self.high)
    }

    /// True if `name` is one of the endpoints.
    pub fn contains(&self, name: &str) -> bool {
        self.low == name || self.high == name
    }

    /// The endpoint that is not `name`.
    pub fn other(&self, name: &str) -> Option<&str> {
        if name == self.low {
            Some(&self.high)
        } else if name == self.high {
            Some(&self.low)
        } else {
            None
        }
    }

    /// Channel label, `low⟷high`.
    pub fn label(&self) -> String {
        format!("{}⟷{}", self.low, self.high)
    }
}

impl fmt::Display for Endpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}⟷{}", self.low, self.high)
    }
}

/// A sent message as recorded in the channel history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub sender: String,
    pub receiver: String,
    /// Ciphertext, lowercase hex.
    pub encrypted: String,
    /// Truncated authentication tag, lowercase hex.
    pub tag: String,
    pub seal: Seal,
    /// Ratchet count after this send.
    pub ratchet: u64,
    pub timestamp: String,
}

/// Outcome of [`RatchetChannel::receive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// The tag matched; the decrypted text (lossy UTF-8).
    Plaintext(String),
    /// The tag did not match the current key.
    IntegrityFailure,
}

impl Received {
    /// True if the message authenticated.
    pub fn is_authentic(&self) -> bool {
        matches!(self, Received::Plaintext(_))
    }

    /// The plaintext, if the message authenticated.
    pub fn plaintext(&self) -> Option<&str> {
        match self {
            Received::Plaintext(text) => Some(text),
            Received::IntegrityFailure => None,
        }
    }

    /// The plaintext, or the integrity-failure sentinel.
    pub fn into_text(self) -> String {
        match self {
            Received::Plaintext(text) => text,
            Received::IntegrityFailure => INTEGRITY_FAILURE.to_string(),
        }
    }
}

impl fmt::Display for Received {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Received::Plaintext(text) => f.write_str(text),
            Received::IntegrityFailure => f.write_str(INTEGRITY_FAILURE),
        }
    }
}

/// Channel summary. Carries a fingerprint of the key, never the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStatus {
    pub channel: String,
    pub ratchet_count: u64,
    pub messages_count: usize,
    pub key_fingerprint: String,
}

/// A pairwise channel with a forward-only ratchet.
///
/// `Clone` copies the full ratchet state, which lets a test harness replay a
/// ciphertext against the state it was produced under.
#[derive(Clone)]
pub struct RatchetChannel {
    endpoints: Endpoints,
    key: SecretKey,
    ratchet_count: u64,
    messages: VecDeque<MessageRecord>,
    history_limit: usize,
    seal: Arc<HashChainSeal>,
}

impl RatchetChannel {
    /// Open a channel between `a` and `b`, sealing into `seal`.
    pub fn new(a: impl Into<String>, b: impl Into<String>, seal: Arc<HashChainSeal>) -> Self {
        Self::with_history_limit(a, b, seal, DEFAULT_HISTORY_LIMIT)
    }

    /// Open a channel that keeps at most `history_limit` sent records.
    pub fn with_history_limit(
        a: impl Into<String>,
        b: impl Into<String>,
        seal: Arc<HashChainSeal>,
        history_limit: usize,
    ) -> Self {
        let endpoints = Endpoints::new(a, b);
        let key = initial_key(&endpoints);
        Self {
            endpoints,
            key,
            ratchet_count: 0,
            messages: VecDeque::with_capacity(history_limit.min(DEFAULT_HISTORY_LIMIT)),
            history_limit,
            seal,
        }
    }

    /// The two participants.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Number of ratchet advances so far.
    pub fn ratchet_count(&self) -> u64 {
        self.ratchet_count
    }

    /// Sent records, oldest first.
    pub fn messages(&self) -> &VecDeque<MessageRecord> {
        &self.messages
    }

    /// Fingerprint of the current key.
    pub fn key_fingerprint(&self) -> String {
        self.key.fingerprint()
    }

    /// Encrypt `content` from `sender` to the other endpoint, seal the
    /// ciphertext, and advance the ratchet.
    pub fn send(&mut self, sender: &str, content: &str) -> Result<MessageRecord, ChannelError> {
        self.send_at(sender, content, Utc::now())
    }

    /// [`RatchetChannel::send`] with an explicit timestamp.
    pub fn send_at(
        &mut self,
        sender: &str,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<MessageRecord, ChannelError> {
        let receiver = self
            .endpoints
            .other(sender)
            .ok_or_else(|| ChannelError::NotAnEndpoint {
                participant: sender.to_string(),
                channel: self.endpoints.label(),
            })?
            .to_string();

        let ciphertext = self.key.apply_keystream(content.as_bytes());
        let tag = self.key.tag(&ciphertext);
        let seal = self.seal.seal_at(&ciphertext, sender, &receiver, at);
        self.advance_ratchet();

        let record = MessageRecord {
            sender: sender.to_string(),
            receiver,
            encrypted: hex::encode(&ciphertext),
            tag: hex::encode(tag),
            seal,
            ratchet: self.ratchet_count,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Micros, true),
        };

        self.messages.push_back(record.clone());
        while self.messages.len() > self.history_limit {
            self.messages.pop_front();
        }

        Ok(record)
    }

    /// Authenticate and decrypt a ciphertext under the current key.
    ///
    /// A tag mismatch yields [`Received::IntegrityFailure`], not an error.
    /// The ratchet advances either way; malformed hex leaves it untouched.
    pub fn receive(&mut self, ciphertext_hex: &str, tag_hex: &str) -> Result<Received, ChannelError> {
        let ciphertext = hex::decode(ciphertext_hex)?;
        let tag = hex::decode(tag_hex)?;

        let received = if self.key.tag(&ciphertext).as_slice() == tag.as_slice() {
            let plaintext = self.key.apply_keystream(&ciphertext);
            Received::Plaintext(String::from_utf8_lossy(&plaintext).into_owned())
        } else {
            warn!(
                channel = %self.endpoints,
                ratchet = self.ratchet_count,
                "tag mismatch on receive"
            );
            Received::IntegrityFailure
        };

        self.advance_ratchet();
        Ok(received)
    }

    /// Channel summary.
    pub fn status(&self) -> ChannelStatus {
        ChannelStatus {
            channel: self.endpoints.label(),
            ratchet_count: self.ratchet_count,
            messages_count: self.messages.len(),
            key_fingerprint: self.key.fingerprint(),
        }
    }

    fn advance_ratchet(&mut self) {
        self.key = self.key.ratchet(self.ratchet_count);
        self.ratchet_count += 1;
        debug!(channel = %self.endpoints, ratchet = self.ratchet_count, "ratchet advanced");
    }
}

impl fmt::Debug for RatchetChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RatchetChannel")
            .field("endpoints", &self.endpoints)
            .field("ratchet_count", &self.ratchet_count)
            .field("messages", &self.messages.len())
            .finish_non_exhaustive()
    }
}

/// Deterministic from public inputs; provides no secrecy.
fn initial_key(endpoints: &Endpoints) -> SecretKey {
    let (low, high) = endpoints.pair();
    SecretKey::derive(format!("{}⟷{}⟷φ={}", low, high, PHI).as_bytes())
}
