//! # Simplex Testkit
//!
//! Testing utilities for Simplex.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a deterministic chain and a small roster, ready to use
//! - **Generators**: Proptest strategies for leaves, rosters, and traffic
//! - **Scenario vectors**: scripted traffic with structural expectations
//!
//! ## Test Fixtures
//!
//! ```rust
//! use simplex_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let record = fixture.send("a", "b", "hello").unwrap();
//! assert_eq!(record.seal.chain_position, 1);
//! ```
//!
//! A full [`simplex::Simplex`] over a [`simplex_store::MemoryStore`] with the
//! same roster:
//!
//! ```rust
//! use simplex_testkit::fixtures::TestFixture;
//!
//! let network = TestFixture::new().network();
//! assert_eq!(network.status().mesh.channels, 3);
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use simplex_testkit::generators::{traffic_from_params, TrafficParams};
//!
//! proptest! {
//!     #[test]
//!     fn chain_tracks_traffic(params: TrafficParams) {
//!         let fixture = traffic_from_params(&params);
//!         prop_assert_eq!(fixture.seal.len(), params.messages.len());
//!     }
//! }
//! ```
//!
//! ## Scenario Vectors
//!
//! ```rust
//! use simplex_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok, detail) in verify_all_vectors() {
//!     assert!(ok, "{}: {}", name, detail);
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{fixed_time, memory_network, roster_of, sealed_chain, TestFixture, FIXTURE_NONCE};
pub use generators::{traffic_from_params, TrafficParams};
pub use vectors::{all_vectors, run_vector, verify_all_vectors, ScenarioVector, Step};
