//! Error types for Simplex.

use simplex_channel::RegistryError;
use simplex_core::ChainError;
use simplex_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Simplex operations.
#[derive(Debug, Error)]
pub enum SimplexError {
    /// The seal chain failed an audit or could not be restored.
    #[error("seal chain error: {0}")]
    Chain(#[from] ChainError),

    /// Channel lookup or channel operation failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for Simplex operations.
pub type Result<T> = std::result::Result<T, SimplexError>;
