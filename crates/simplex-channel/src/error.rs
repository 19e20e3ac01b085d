//! Error types for channels and the registry.
//!
//! A failed integrity check is not an error; see
//! [`Received::IntegrityFailure`](crate::Received::IntegrityFailure).

use thiserror::Error;

/// Programming errors on a single channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("{participant} is not an endpoint of channel {channel}")]
    NotAnEndpoint { participant: String, channel: String },

    #[error("malformed hex: {0}")]
    MalformedHex(#[from] hex::FromHexError),
}

/// Errors from registry lookups and routing.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("a participant cannot open a channel to itself: {0}")]
    SelfChannel(String),

    #[error("unknown participant: {0}")]
    UnknownParticipant(String),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}
