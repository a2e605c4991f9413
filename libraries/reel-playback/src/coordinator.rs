//! Playback coordinator - core orchestration
//!
//! Ties visibility, policy and lifecycle together for one list. Every decision
//! cycle converges all registered players on a single target: the active card
//! plays, everything else pauses. Players that failed or diverged are marked
//! `Idle` and re-driven on the next cycle, so the coordinator self-heals
//! instead of retrying.

use crate::{
    events::{CoordinatorEvent, LifecycleViolation},
    lifecycle::{CardLifecycleManager, MountOutcome, Mounted, UnmountOutcome},
    policy::ActivationPolicy,
    registry::Dispatch,
    types::{FeedConfig, HandleState},
    visibility::{ViewabilityChange, VisibilityTracker},
};
use reel_core::{
    ActiveCard, Card, CardId, HandleFactory, HandleNotice, PlaybackCommand, ReelError, Result,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Outcome of one decision cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Active card before the cycle
    pub previous: ActiveCard,

    /// Active card after the cycle
    pub active: ActiveCard,

    /// Commands sent to players
    pub issued: usize,

    /// Commands players rejected
    pub failures: usize,
}

impl CycleReport {
    /// Whether the active card changed
    pub fn changed(&self) -> bool {
        self.previous != self.active
    }
}

/// Running counters for a coordinator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Decision cycles run
    pub cycles: u64,

    /// Player commands that failed (synchronously or asynchronously)
    pub command_failures: u64,
}

/// Visibility-driven playback for one list instance
///
/// Exclusively owns the handle registry and the active card. All mutation
/// goes through `&mut self`, so a cycle can never start while another is
/// being applied.
pub struct PlaybackCoordinator {
    tracker: VisibilityTracker,
    policy: ActivationPolicy,
    lifecycle: CardLifecycleManager,
    active: ActiveCard,
    viewport_height: f64,

    // Set by a navigation hand-off; cycles keep everything paused until resume()
    suspended: bool,
    torn_down: bool,

    stats: CoordinatorStats,
    pending_events: Vec<CoordinatorEvent>,
}

impl PlaybackCoordinator {
    /// Create a coordinator
    ///
    /// # Errors
    /// Returns `ReelError::InvalidConfig` if the configuration fails validation
    pub fn new(config: &FeedConfig, factory: Box<dyn HandleFactory>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            tracker: VisibilityTracker::new(),
            policy: config.policy(),
            lifecycle: CardLifecycleManager::new(factory, config.default_muted),
            active: ActiveCard::None,
            viewport_height: config.viewport_height,
            suspended: false,
            torn_down: false,
            stats: CoordinatorStats::default(),
            pending_events: Vec::new(),
        })
    }

    // ===== Host notifications =====

    /// Record a card's layout
    ///
    /// Layouts for cards that are not mounted are dropped, so a late layout
    /// after unmount cannot leave stale geometry behind.
    pub fn record_geometry(&mut self, card: CardId, top: f64, height: f64) {
        if !self.lifecycle.is_mounted(card) {
            debug!("Dropping layout for unmounted card {}", card);
            return;
        }
        self.tracker.record_geometry(card, top, height);
    }

    /// Record the list's scroll offset
    #[inline]
    pub fn record_scroll(&mut self, offset: f64) {
        self.tracker.record_scroll(offset);
    }

    /// Update the viewport height (rotation, split screen)
    ///
    /// Non-positive or non-finite heights are ignored.
    pub fn set_viewport_height(&mut self, height: f64) {
        if height.is_finite() && height > 0.0 {
            self.viewport_height = height;
        } else {
            warn!("Ignoring invalid viewport height {}", height);
        }
    }

    /// Record a viewability notification without deciding
    pub fn record_viewability(&mut self, changes: &[ViewabilityChange]) {
        self.tracker.apply_viewability(changes);
    }

    /// Viewability notification: record it and decide immediately
    pub fn on_viewability(&mut self, changes: &[ViewabilityChange]) -> CycleReport {
        self.record_viewability(changes);
        self.run_cycle()
    }

    /// Ingest a state-change notification from a player
    pub fn handle_notice(&mut self, notice: HandleNotice) {
        let card = notice.card();
        let Some(slot) = self.lifecycle.registry_mut().get_mut(card) else {
            debug!("Dropping notice for unmounted card {}", card);
            return;
        };

        let follow_up = match notice {
            HandleNotice::Settled { playing, .. } => {
                debug!("Card {} settled (playing: {})", card, playing);
                slot.settle(playing)
            }
            HandleNotice::Failed { command, error, .. } => {
                warn!("Card {} failed to {}: {}", card, command, error);
                self.stats.command_failures += 1;
                self.pending_events.push(CoordinatorEvent::CommandFailed {
                    card,
                    command,
                    message: error.to_string(),
                });
                slot.fail()
            }
        };

        if let Some(dispatch) = follow_up {
            self.record_dispatch(card, dispatch);
        }
    }

    // ===== Lifecycle =====

    /// Create and register a player for a mounting card
    ///
    /// # Errors
    /// Returns `ReelError::HandleCreation` if the player cannot be created
    pub fn on_mount(&mut self, card: Card) -> Result<Mounted<'_>> {
        if self.torn_down {
            return Err(ReelError::SessionClosed);
        }

        let id = card.id;
        let mounted = self.lifecycle.on_mount(card)?;

        match mounted.outcome {
            MountOutcome::Registered => {
                self.pending_events
                    .push(CoordinatorEvent::CardMounted { card: id });
            }
            MountOutcome::AlreadyMounted => {}
            MountOutcome::SourceConflict => {
                self.pending_events.push(CoordinatorEvent::LifecycleIgnored {
                    card: id,
                    reason: LifecycleViolation::SourceConflict,
                });
            }
        }

        Ok(mounted)
    }

    /// Release the player of an unmounting card
    ///
    /// If the card was active, the active card is cleared in the same call.
    pub fn on_unmount(&mut self, card: CardId) -> UnmountOutcome {
        let outcome = self.lifecycle.on_unmount(card);
        self.tracker.forget(card);

        match outcome {
            UnmountOutcome::Released => {
                self.pending_events
                    .push(CoordinatorEvent::CardUnmounted { card });

                if self.active.is(card) {
                    debug!("Active card {} unmounted", card);
                    self.set_active(ActiveCard::None);
                }
            }
            UnmountOutcome::NotMounted => {
                self.pending_events.push(CoordinatorEvent::LifecycleIgnored {
                    card,
                    reason: LifecycleViolation::UnknownCard,
                });
            }
        }

        outcome
    }

    // ===== Decisions =====

    /// Run one decision cycle: geometry, policy, then play/pause commands
    pub fn run_cycle(&mut self) -> CycleReport {
        let previous = self.active;

        if self.torn_down {
            return CycleReport {
                previous,
                active: previous,
                issued: 0,
                failures: 0,
            };
        }

        self.stats.cycles += 1;

        let decided = if self.suspended {
            ActiveCard::None
        } else {
            let fractions = self.registered_fractions();
            self.policy.decide(&fractions, self.active)
        };

        self.set_active(decided);
        let (issued, failures) = self.converge();

        CycleReport {
            previous,
            active: decided,
            issued,
            failures,
        }
    }

    /// Navigation hand-off: pause the active card and stop auto-play
    ///
    /// Auto-play stays off until `resume()`. Returns the card that was active.
    pub fn pause_active(&mut self) -> ActiveCard {
        let previous = self.active;
        self.suspended = true;

        if let ActiveCard::Card(card) = previous {
            info!("Pausing card {} for hand-off", card);
            self.set_active(ActiveCard::None);
            if let Some(slot) = self.lifecycle.registry_mut().get_mut(card) {
                let dispatch = slot.drive(PlaybackCommand::Pause);
                self.record_dispatch(card, dispatch);
            }
        }

        previous
    }

    /// Re-enable auto-play after a hand-off
    pub fn resume(&mut self) {
        if self.suspended {
            debug!("Resuming auto-play");
        }
        self.suspended = false;
    }

    /// Mute or unmute every player, now and for future mounts
    pub fn set_muted(&mut self, muted: bool) {
        self.lifecycle.set_muted(muted);
    }

    /// Pause and release every player
    ///
    /// Idempotent; also runs when the coordinator is dropped. Returns the
    /// number of players released by this call.
    pub fn teardown(&mut self) -> usize {
        if self.torn_down {
            return 0;
        }
        self.torn_down = true;

        self.set_active(ActiveCard::None);
        let released = self.lifecycle.release_all();

        info!("Feed torn down, released {} players", released);
        self.pending_events
            .push(CoordinatorEvent::TornDown { released });

        released
    }

    // ===== State queries =====

    /// Current active card
    pub fn active(&self) -> ActiveCard {
        self.active
    }

    /// Tracked state of a card's player
    pub fn state_of(&self, card: CardId) -> Option<HandleState> {
        self.lifecycle.registry().state_of(card)
    }

    /// Tracked state of every registered player, ordered by card
    pub fn states(&self) -> Vec<(CardId, HandleState)> {
        self.lifecycle.registry().states()
    }

    /// Whether a card has a registered player
    pub fn is_mounted(&self, card: CardId) -> bool {
        self.lifecycle.is_mounted(card)
    }

    /// Number of registered players
    pub fn mounted_len(&self) -> usize {
        self.lifecycle.mounted_len()
    }

    /// Whether auto-play is suspended by a hand-off
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Whether the feed-wide mute flag is set
    pub fn is_muted(&self) -> bool {
        self.lifecycle.is_muted()
    }

    /// Whether `teardown()` has run
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Visibility tracker
    pub fn tracker(&self) -> &VisibilityTracker {
        &self.tracker
    }

    /// Activation policy
    pub fn policy(&self) -> ActivationPolicy {
        self.policy
    }

    /// Current viewport height
    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    /// Running counters
    pub fn stats(&self) -> CoordinatorStats {
        self.stats
    }

    // ===== Events =====

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<CoordinatorEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Check if there are pending events
    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    // ===== Internals =====

    fn registered_fractions(&self) -> BTreeMap<CardId, f64> {
        self.tracker
            .fractions(self.viewport_height)
            .into_iter()
            .filter(|(card, _)| self.lifecycle.is_mounted(*card))
            .collect()
    }

    fn set_active(&mut self, next: ActiveCard) {
        if self.active == next {
            return;
        }

        debug!("Active card {} -> {}", self.active, next);
        self.pending_events.push(CoordinatorEvent::ActiveChanged {
            previous: self.active,
            current: next,
        });
        self.active = next;
    }

    /// Drive every slot toward the active card's target. Pauses go out before
    /// the play so two players never run at once.
    fn converge(&mut self) -> (usize, usize) {
        let active = self.active;
        let mut dispatches = Vec::new();

        for (card, slot) in self.lifecycle.registry_mut().iter_mut() {
            if !active.is(card) {
                dispatches.push((card, slot.drive(PlaybackCommand::Pause)));
            }
        }

        if let ActiveCard::Card(card) = active {
            if let Some(slot) = self.lifecycle.registry_mut().get_mut(card) {
                dispatches.push((card, slot.drive(PlaybackCommand::Play)));
            }
        }

        let mut issued = 0;
        let mut failures = 0;
        for (card, dispatch) in dispatches {
            match &dispatch {
                Dispatch::Issued(_) => issued += 1,
                Dispatch::Failed(..) => failures += 1,
                Dispatch::Unchanged | Dispatch::Deferred => {}
            }
            self.record_dispatch(card, dispatch);
        }

        (issued, failures)
    }

    fn record_dispatch(&mut self, card: CardId, dispatch: Dispatch) {
        match dispatch {
            Dispatch::Issued(command) => debug!("Sent {} to card {}", command, card),
            Dispatch::Deferred => debug!("Card {} busy, request deferred", card),
            Dispatch::Unchanged => {}
            Dispatch::Failed(command, error) => {
                warn!("Card {} rejected {}: {}", card, command, error);
                self.stats.command_failures += 1;
                self.pending_events.push(CoordinatorEvent::CommandFailed {
                    card,
                    command,
                    message: error.to_string(),
                });
            }
        }
    }
}

impl Drop for PlaybackCoordinator {
    fn drop(&mut self) {
        self.teardown();
    }
}
