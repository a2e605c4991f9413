//! Coordinator Events
//!
//! Event-based communication for the host UI. Events are queued while the
//! coordinator works and drained by the owner:
//! - Active card changes (including clears on unmount and hand-off)
//! - Player command failures
//! - Mount/unmount bookkeeping and redundant lifecycle deliveries
//! - Teardown

use reel_core::{ActiveCard, CardId, PlaybackCommand};
use serde::{Deserialize, Serialize};

/// Events emitted by a playback coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CoordinatorEvent {
    /// The active card changed
    ActiveChanged {
        /// Previously active card
        previous: ActiveCard,
        /// Newly active card
        current: ActiveCard,
    },

    /// A player rejected or failed a command
    ///
    /// The coordinator retries on the next decision cycle.
    CommandFailed {
        /// Card that owns the player
        card: CardId,
        /// Command that failed
        command: PlaybackCommand,
        /// Failure description
        message: String,
    },

    /// A player was created and registered
    CardMounted {
        /// Mounted card
        card: CardId,
    },

    /// A player was paused and released
    CardUnmounted {
        /// Unmounted card
        card: CardId,
    },

    /// A lifecycle notification was redundant or inconsistent and was ignored
    LifecycleIgnored {
        /// Card named by the notification
        card: CardId,
        /// Why it was ignored
        reason: LifecycleViolation,
    },

    /// Every player was paused and released
    TornDown {
        /// Number of players released
        released: usize,
    },
}

/// Kinds of ignored lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleViolation {
    /// Unmount for a card that is not mounted
    UnknownCard,

    /// Second mount of a live card with a different source
    SourceConflict,
}

impl std::fmt::Display for LifecycleViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleViolation::UnknownCard => write!(f, "card is not mounted"),
            LifecycleViolation::SourceConflict => {
                write!(f, "card is already mounted with a different source")
            }
        }
    }
}
