//! Playback capability traits for Reel feeds
use crate::error::HandleError;
use crate::types::{Card, CardId};
use serde::{Deserialize, Serialize};

/// Command the coordinator can send to a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackCommand {
    /// Start or resume playback
    Play,
    /// Pause playback
    Pause,
}

impl std::fmt::Display for PlaybackCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Play => write!(f, "play"),
            Self::Pause => write!(f, "pause"),
        }
    }
}

/// How a player accepted a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Applied before the call returned
    Done,

    /// Accepted; completion arrives later as a [`HandleNotice`]
    ///
    /// Until that notice is delivered the coordinator sends no further command
    /// to this player.
    Pending,
}

/// Control capability for one video resource
///
/// Implemented by the host platform (AVPlayer, ExoPlayer, a GStreamer
/// pipeline). Calls must return promptly: anything slow belongs behind
/// `CommandStatus::Pending` and a later [`HandleNotice`].
pub trait PlaybackHandle: Send {
    /// Start or resume playback
    ///
    /// # Errors
    /// Returns an error if the player is not ready or rejects the command
    fn play(&mut self) -> Result<CommandStatus, HandleError>;

    /// Pause playback
    ///
    /// # Errors
    /// Returns an error if the player rejects the command
    fn pause(&mut self) -> Result<CommandStatus, HandleError>;

    /// Loop the clip when it reaches the end
    fn set_looping(&mut self, looping: bool);

    /// Mute or unmute audio
    fn set_muted(&mut self, muted: bool);

    /// Whether the player currently reports itself as playing
    fn is_playing(&self) -> bool;

    /// Free the underlying resource
    ///
    /// Called exactly once, after the final pause, when the card unmounts.
    fn release(&mut self) {}
}

impl std::fmt::Debug for dyn PlaybackHandle + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("playing", &self.is_playing())
            .finish()
    }
}

/// Creates players for cards as they mount
pub trait HandleFactory: Send {
    /// Build a player for `card`
    ///
    /// # Errors
    /// Returns an error if the platform cannot allocate a player for the source
    fn create(&mut self, card: &Card) -> Result<Box<dyn PlaybackHandle>, HandleError>;
}

impl<F> HandleFactory for F
where
    F: FnMut(&Card) -> Result<Box<dyn PlaybackHandle>, HandleError> + Send,
{
    fn create(&mut self, card: &Card) -> Result<Box<dyn PlaybackHandle>, HandleError> {
        self(card)
    }
}

/// State-change notification emitted by a player
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleNotice {
    /// The player finished applying a command (or changed state on its own)
    Settled {
        /// Card that owns the player
        card: CardId,
        /// Whether the player is now playing
        playing: bool,
    },

    /// A pending command failed asynchronously
    Failed {
        /// Card that owns the player
        card: CardId,
        /// Command that failed
        command: PlaybackCommand,
        /// Failure reported by the player
        error: HandleError,
    },
}

impl HandleNotice {
    /// Card the notice refers to
    pub fn card(&self) -> CardId {
        match self {
            Self::Settled { card, .. } | Self::Failed { card, .. } => *card,
        }
    }
}
