//! # Simplex Store
//!
//! Persistence for the Simplex seal chain. Provides a trait-based interface
//! with SQLite and in-memory implementations.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`AppendResult`] - Result of appending a seal
//!
//! ## Usage
//!
//! ```rust,no_run
//! use simplex_store::{SqliteStore, Store};
//!
//! async fn example() {
//!     let store = SqliteStore::open("simplex.db").unwrap();
//!     let count = store.seal_count().await.unwrap();
//!     println!("{} seals on disk", count);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Append-only**: seals are written in position order and never rewritten
//! - **Idempotent appends**: writing the same seal twice returns `AlreadyExists`
//! - **Conflict detection**: a different seal at a stored position returns `Conflict`
//! - **No trust in storage**: loaded seals are re-audited by the caller on restore

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AppendResult, Store, StoredSeal};
