//! Scenario vectors: scripted traffic with structural expectations.
//!
//! Digests depend on the fixture nonce and timestamps, so the vectors pin
//! shape instead: channel counts, chain length, ratchet counters.

use simplex_channel::RegistryError;

use crate::fixtures::TestFixture;

/// One scripted action.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Send {
        from: &'static str,
        to: &'static str,
        text: &'static str,
    },
    Broadcast {
        from: &'static str,
        text: &'static str,
    },
}

/// A scenario and what the mesh must look like afterwards.
#[derive(Debug, Clone)]
pub struct ScenarioVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub roster: &'static [&'static str],
    /// Open channels lazily instead of up front.
    pub lazy: bool,
    pub steps: &'static [Step],
    pub expected_channels: usize,
    pub expected_chain_length: usize,
    pub expected_total_messages: usize,
    /// `(a, b, ratchet_count)` for selected channels.
    pub expected_ratchets: &'static [(&'static str, &'static str, u64)],
}

/// Get all scenario vectors.
pub fn all_vectors() -> Vec<ScenarioVector> {
    vec![
        ScenarioVector {
            name: "broadcast over three participants",
            roster: &["a", "b", "c"],
            lazy: false,
            steps: &[Step::Broadcast { from: "a", text: "hello" }],
            expected_channels: 3,
            expected_chain_length: 2,
            expected_total_messages: 2,
            expected_ratchets: &[("a", "b", 1), ("a", "c", 1), ("b", "c", 0)],
        },
        ScenarioVector {
            name: "conversation on one lazy channel",
            roster: &["leonardo", "nyx", "zoe"],
            lazy: true,
            steps: &[
                Step::Send { from: "leonardo", to: "nyx", text: "ping" },
                Step::Send { from: "nyx", to: "leonardo", text: "pong" },
                Step::Send { from: "leonardo", to: "nyx", text: "ping again" },
            ],
            expected_channels: 1,
            expected_chain_length: 3,
            expected_total_messages: 3,
            expected_ratchets: &[("nyx", "leonardo", 3)],
        },
        ScenarioVector {
            name: "default roster round",
            roster: &["leonardo", "nyx", "zoe", "euterpe", "omniscient"],
            lazy: false,
            steps: &[
                Step::Broadcast { from: "zoe", text: "status?" },
                Step::Send { from: "omniscient", to: "zoe", text: "all clear" },
                Step::Send { from: "euterpe", to: "zoe", text: "" },
            ],
            expected_channels: 10,
            expected_chain_length: 6,
            expected_total_messages: 6,
            expected_ratchets: &[("zoe", "omniscient", 2), ("euterpe", "zoe", 2), ("leonardo", "nyx", 0)],
        },
        ScenarioVector {
            name: "empty traffic",
            roster: &["a", "b"],
            lazy: true,
            steps: &[],
            expected_channels: 0,
            expected_chain_length: 0,
            expected_total_messages: 0,
            expected_ratchets: &[],
        },
    ]
}

/// Play a vector through a fresh fixture.
pub fn run_vector(vector: &ScenarioVector) -> Result<TestFixture, RegistryError> {
    let fixture = if vector.lazy {
        TestFixture::with_roster_lazy(vector.roster.iter().copied())
    } else {
        TestFixture::with_roster(vector.roster.iter().copied())
    };

    for step in vector.steps {
        match *step {
            Step::Send { from, to, text } => {
                fixture.send(from, to, text)?;
            }
            Step::Broadcast { from, text } => {
                fixture.broadcast(from, text)?;
            }
        }
    }
    Ok(fixture)
}

fn check_vector(vector: &ScenarioVector) -> Result<(), String> {
    let fixture = run_vector(vector).map_err(|e| e.to_string())?;
    let status = fixture.registry.status();

    if status.channels != vector.expected_channels {
        return Err(format!(
            "expected {} channels, got {}",
            vector.expected_channels, status.channels
        ));
    }
    if fixture.seal.len() != vector.expected_chain_length {
        return Err(format!(
            "expected chain length {}, got {}",
            vector.expected_chain_length,
            fixture.seal.len()
        ));
    }
    if status.total_messages != vector.expected_total_messages {
        return Err(format!(
            "expected {} messages, got {}",
            vector.expected_total_messages, status.total_messages
        ));
    }
    for &(a, b, expected) in vector.expected_ratchets {
        let channel = fixture.registry.get_channel(a, b).map_err(|e| e.to_string())?;
        let actual = channel.lock().ratchet_count();
        if actual != expected {
            return Err(format!("{}⟷{}: expected ratchet {}, got {}", a, b, expected, actual));
        }
    }
    fixture.seal.audit().map_err(|e| e.to_string())
}

/// Check every vector. Returns `(name, passed, detail)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| match check_vector(v) {
            Ok(()) => (v.name.to_string(), true, String::new()),
            Err(detail) => (v.name.to_string(), false, detail),
        })
        .collect()
}
