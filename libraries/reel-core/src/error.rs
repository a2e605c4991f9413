/// Core error types for Reel feeds
use crate::types::CardId;
use thiserror::Error;

/// Result type alias using `ReelError`
pub type Result<T> = std::result::Result<T, ReelError>;

/// Failure reported by a playback handle
///
/// These are always recoverable from the coordinator's point of view: the
/// failing command is logged and the next decision cycle tries again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// The underlying player has not finished loading its source
    #[error("Player not ready")]
    NotReady,

    /// The player was already released and can no longer be driven
    #[error("Player released")]
    Released,

    /// The platform player rejected the command
    #[error("Player resource error: {0}")]
    Resource(String),
}

impl HandleError {
    /// Create a resource error
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }
}

/// Core error type for Reel feeds
#[derive(Error, Debug)]
pub enum ReelError {
    /// The host could not create a player for a card
    #[error("Failed to create player for card {card}: {source}")]
    HandleCreation {
        /// Card that was being mounted
        card: CardId,
        /// Failure reported by the factory
        source: HandleError,
    },

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The feed session task is no longer running
    #[error("Feed session closed")]
    SessionClosed,
}

impl ReelError {
    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
