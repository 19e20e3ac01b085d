//! Simplex configuration.

use serde::{Deserialize, Serialize};
use simplex_channel::{MeshConfig, DEFAULT_HISTORY_LIMIT, DEFAULT_ROSTER};

use crate::error::Result;

/// Configuration for a [`Simplex`](crate::Simplex) instance.
///
/// Every field has a default, so partial JSON documents are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplexConfig {
    /// Participants, in broadcast order.
    pub roster: Vec<String>,
    /// Open every channel at startup instead of on first use.
    pub eager_mesh: bool,
    /// Sent records kept per channel.
    pub history_limit: usize,
    /// Write new seals to the store after every send.
    pub persist_on_send: bool,
}

impl Default for SimplexConfig {
    fn default() -> Self {
        Self {
            roster: DEFAULT_ROSTER.iter().map(|s| s.to_string()).collect(),
            eager_mesh: true,
            history_limit: DEFAULT_HISTORY_LIMIT,
            persist_on_send: false,
        }
    }
}

impl SimplexConfig {
    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Registry settings derived from this config.
    pub fn mesh(&self) -> MeshConfig {
        MeshConfig {
            roster: self.roster.clone(),
            eager: self.eager_mesh,
            history_limit: self.history_limit,
        }
    }
}
