//! Reel - Feed Playback Coordination
//!
//! Decides which card of a vertically scrolling video feed plays, and keeps
//! every player consistent with that decision.
//!
//! This crate provides:
//! - Visibility tracking (card layout, scroll offset, viewability masks)
//! - An activation policy with a visibility threshold and hysteresis
//! - Per-card player lifecycle (create on mount, pause and release on unmount)
//! - A coordinator that converges all players on the active card
//! - An async session that drives the coordinator from scroll polling or
//!   viewability notifications
//!
//! # Architecture
//!
//! `reel-playback` is platform-agnostic. Players are provided by the host
//! through the `PlaybackHandle` and `HandleFactory` traits from `reel-core`.
//! The coordinator is synchronous and owns every player; the session wraps it
//! in a single tokio task.
//!
//! # Example: Driving the coordinator
//!
//! ```rust
//! use reel_core::{Card, CardId, CommandStatus, HandleError, PlaybackHandle};
//! use reel_playback::{ActiveCard, FeedConfig, PlaybackCoordinator};
//!
//! struct Player;
//!
//! impl PlaybackHandle for Player {
//!     fn play(&mut self) -> Result<CommandStatus, HandleError> {
//!         Ok(CommandStatus::Done)
//!     }
//!     fn pause(&mut self) -> Result<CommandStatus, HandleError> {
//!         Ok(CommandStatus::Done)
//!     }
//!     fn set_looping(&mut self, _looping: bool) {}
//!     fn set_muted(&mut self, _muted: bool) {}
//!     fn is_playing(&self) -> bool {
//!         false
//!     }
//! }
//!
//! let factory = |_card: &Card| -> Result<Box<dyn PlaybackHandle>, HandleError> {
//!     Ok(Box::new(Player))
//! };
//! let mut coordinator = PlaybackCoordinator::new(&FeedConfig::default(), Box::new(factory))?;
//!
//! for id in 0..3 {
//!     coordinator.on_mount(Card::new(CardId::new(id), "clip.mp4", "Clip"))?;
//!     coordinator.record_geometry(CardId::new(id), id as f64 * 600.0, 500.0);
//! }
//!
//! coordinator.record_scroll(0.0);
//! coordinator.run_cycle();
//! assert_eq!(coordinator.active(), ActiveCard::Card(CardId::new(0)));
//!
//! coordinator.record_scroll(650.0);
//! coordinator.run_cycle();
//! assert_eq!(coordinator.active(), ActiveCard::Card(CardId::new(1)));
//! # Ok::<(), reel_core::ReelError>(())
//! ```
//!
//! # Example: Async session
//!
//! ```rust,no_run
//! use reel_core::{Card, CardId, CommandStatus, HandleError, PlaybackHandle};
//! use reel_playback::{FeedConfig, FeedSession};
//!
//! # struct Player;
//! # impl PlaybackHandle for Player {
//! #     fn play(&mut self) -> Result<CommandStatus, HandleError> { Ok(CommandStatus::Done) }
//! #     fn pause(&mut self) -> Result<CommandStatus, HandleError> { Ok(CommandStatus::Done) }
//! #     fn set_looping(&mut self, _looping: bool) {}
//! #     fn set_muted(&mut self, _muted: bool) {}
//! #     fn is_playing(&self) -> bool { false }
//! # }
//! # async fn demo() -> reel_core::Result<()> {
//! let factory = |_card: &Card| -> Result<Box<dyn PlaybackHandle>, HandleError> {
//!     Ok(Box::new(Player))
//! };
//! let session = FeedSession::spawn(FeedConfig::default(), factory)?;
//! let feed = session.handle();
//!
//! feed.mount(Card::new(CardId::new(0), "clip.mp4", "Clip")).await?;
//! feed.layout(CardId::new(0), 0.0, 500.0)?;
//! feed.scroll(120.0);
//!
//! let summary = session.shutdown().await?;
//! println!("released {} players", summary.released);
//! # Ok(())
//! # }
//! ```

mod coordinator;
mod events;
mod lifecycle;
mod policy;
mod registry;
mod session;
pub mod types;
mod visibility;

// Public exports
pub use coordinator::{CoordinatorStats, CycleReport, PlaybackCoordinator};
pub use events::{CoordinatorEvent, LifecycleViolation};
pub use lifecycle::{CardLifecycleManager, MountOutcome, Mounted, UnmountOutcome};
pub use policy::ActivationPolicy;
pub use session::{FeedHandle, FeedSession, FeedSnapshot, SessionSummary};
pub use types::{FeedConfig, HandleState, TriggerMode};
pub use visibility::{ScrollState, ViewabilityChange, VisibilityTracker};

pub use reel_core::{ActiveCard, Card, CardId, ReelError, Result};
