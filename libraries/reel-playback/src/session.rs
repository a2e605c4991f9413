//! Feed session - async driver for one list instance
//!
//! A session spawns a single tokio task that owns the `PlaybackCoordinator`.
//! The host talks to it through a cloneable `FeedHandle`:
//! - scroll offsets travel through a `watch` channel: sending never blocks and
//!   only the latest offset is ever read
//! - everything else travels through an unbounded command channel, processed
//!   in order
//!
//! Before each decision cycle the task drains every queued command, so a burst
//! of triggers collapses into one cycle against the newest snapshot.
//!
//! Teardown is scoped to the session: `shutdown()` stops the loop and releases
//! every player, and dropping the session aborts the task, which drops the
//! coordinator and releases the players the same way.

use crate::{
    coordinator::PlaybackCoordinator,
    events::CoordinatorEvent,
    lifecycle::MountOutcome,
    types::{FeedConfig, HandleState, TriggerMode},
    visibility::ViewabilityChange,
};
use reel_core::{ActiveCard, Card, CardId, HandleFactory, HandleNotice, ReelError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Commands accepted by the session task
#[derive(Debug)]
enum FeedCommand {
    Layout {
        card: CardId,
        top: f64,
        height: f64,
    },
    Mount {
        card: Card,
        reply: oneshot::Sender<Result<MountOutcome>>,
    },
    Unmount(CardId),
    Viewability(Vec<ViewabilityChange>),
    Notice(HandleNotice),
    ViewportHeight(f64),
    SetMuted(bool),
    PauseActive {
        reply: oneshot::Sender<ActiveCard>,
    },
    Resume,
    Snapshot {
        reply: oneshot::Sender<FeedSnapshot>,
    },
    Shutdown,
}

impl FeedCommand {
    fn observes_state(&self) -> bool {
        matches!(self, Self::PauseActive { .. } | Self::Snapshot { .. })
    }
}

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    /// Active card
    pub active: ActiveCard,

    /// Tracked player states, ordered by card
    pub states: Vec<(CardId, HandleState)>,

    /// Scroll offset used by the last cycle
    pub scroll_offset: f64,

    /// Whether auto-play is suspended by a hand-off
    pub suspended: bool,

    /// Decision cycles run so far
    pub cycles: u64,
}

impl FeedSnapshot {
    /// Cards whose players are tracked as playing
    pub fn playing(&self) -> Vec<CardId> {
        self.states
            .iter()
            .filter(|(_, state)| *state == HandleState::Playing)
            .map(|(card, _)| *card)
            .collect()
    }
}

/// Totals reported when a session shuts down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Decision cycles run
    pub cycles: u64,

    /// Triggers folded into an already scheduled cycle
    pub coalesced_triggers: u64,

    /// Player commands that failed
    pub command_failures: u64,

    /// Players released at shutdown
    pub released: usize,

    /// Active card just before shutdown
    pub final_active: ActiveCard,
}

/// Cloneable host-side handle to a running session
#[derive(Debug, Clone)]
pub struct FeedHandle {
    commands: mpsc::UnboundedSender<FeedCommand>,
    scroll: Arc<watch::Sender<f64>>,
}

impl FeedHandle {
    /// Report the scroll offset; safe to call every frame
    #[inline]
    pub fn scroll(&self, offset: f64) {
        self.scroll.send_replace(offset);
    }

    /// Report a card's layout
    pub fn layout(&self, card: CardId, top: f64, height: f64) -> Result<()> {
        self.send(FeedCommand::Layout { card, top, height })
    }

    /// Mount a card and wait for its player to be registered
    pub async fn mount(&self, card: Card) -> Result<MountOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(FeedCommand::Mount { card, reply })?;
        rx.await.map_err(|_| ReelError::SessionClosed)?
    }

    /// Unmount a card
    pub fn unmount(&self, card: CardId) -> Result<()> {
        self.send(FeedCommand::Unmount(card))
    }

    /// Deliver a viewability notification
    pub fn viewability(&self, changes: Vec<ViewabilityChange>) -> Result<()> {
        self.send(FeedCommand::Viewability(changes))
    }

    /// Forward a player's state-change notification
    pub fn notice(&self, notice: HandleNotice) -> Result<()> {
        self.send(FeedCommand::Notice(notice))
    }

    /// Update the viewport height
    pub fn set_viewport_height(&self, height: f64) -> Result<()> {
        self.send(FeedCommand::ViewportHeight(height))
    }

    /// Mute or unmute the whole feed
    pub fn set_muted(&self, muted: bool) -> Result<()> {
        self.send(FeedCommand::SetMuted(muted))
    }

    /// Pause the active card before handing control to navigation
    ///
    /// Returns the card that was active. Auto-play stays off until `resume()`.
    pub async fn pause_active(&self) -> Result<ActiveCard> {
        let (reply, rx) = oneshot::channel();
        self.send(FeedCommand::PauseActive { reply })?;
        rx.await.map_err(|_| ReelError::SessionClosed)
    }

    /// Re-enable auto-play after a hand-off
    pub fn resume(&self) -> Result<()> {
        self.send(FeedCommand::Resume)
    }

    /// Current session state
    pub async fn snapshot(&self) -> Result<FeedSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(FeedCommand::Snapshot { reply })?;
        rx.await.map_err(|_| ReelError::SessionClosed)
    }

    fn send(&self, command: FeedCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| ReelError::SessionClosed)
    }
}

/// A running feed: one coordinator task plus its host handle
pub struct FeedSession {
    handle: FeedHandle,
    task: Option<JoinHandle<SessionSummary>>,
    events: Option<mpsc::UnboundedReceiver<CoordinatorEvent>>,
}

impl FeedSession {
    /// Start a session on the current tokio runtime
    ///
    /// # Errors
    /// Returns `ReelError::InvalidConfig` if the configuration fails validation
    pub fn spawn(config: FeedConfig, factory: impl HandleFactory + 'static) -> Result<Self> {
        let coordinator = PlaybackCoordinator::new(&config, Box::new(factory))?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (scroll_tx, scroll_rx) = watch::channel(0.0);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let ticker = match config.trigger {
            TriggerMode::Polling => Some(polling_interval(config.poll_interval())),
            TriggerMode::Viewability => None,
        };

        info!(
            "Starting feed session (trigger: {:?}, min_fraction: {}, margin: {})",
            config.trigger, config.min_fraction, config.hysteresis_margin
        );

        let worker = SessionWorker {
            coordinator,
            commands: command_rx,
            scroll: scroll_rx,
            events: event_tx,
            coalesced: 0,
        };
        let task = tokio::spawn(worker.run(ticker));

        Ok(Self {
            handle: FeedHandle {
                commands: command_tx,
                scroll: Arc::new(scroll_tx),
            },
            task: Some(task),
            events: Some(event_rx),
        })
    }

    /// Host-side handle
    pub fn handle(&self) -> FeedHandle {
        self.handle.clone()
    }

    /// Take the event stream (only once)
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<CoordinatorEvent>> {
        self.events.take()
    }

    /// Stop the session, pause and release every player
    ///
    /// # Errors
    /// Returns `ReelError::SessionClosed` if the task already stopped abnormally
    pub async fn shutdown(mut self) -> Result<SessionSummary> {
        let Some(task) = self.task.take() else {
            return Err(ReelError::SessionClosed);
        };

        // The task may already have exited; the join below tells us how
        let _ = self.handle.commands.send(FeedCommand::Shutdown);

        task.await.map_err(|e| {
            warn!("Feed session task ended abnormally: {}", e);
            ReelError::SessionClosed
        })
    }
}

impl Drop for FeedSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("Feed session dropped without shutdown, aborting task");
            task.abort();
        }
    }
}

fn polling_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

enum Flow {
    Continue,
    Cycle,
    Stop,
}

struct SessionWorker {
    coordinator: PlaybackCoordinator,
    commands: mpsc::UnboundedReceiver<FeedCommand>,
    scroll: watch::Receiver<f64>,
    events: mpsc::UnboundedSender<CoordinatorEvent>,
    coalesced: u64,
}

impl SessionWorker {
    async fn run(mut self, mut ticker: Option<Interval>) -> SessionSummary {
        loop {
            let stop = tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(command) => self.handle_batch(command),
                    None => {
                        debug!("All feed handles dropped");
                        true
                    }
                },

                _ = next_tick(&mut ticker) => {
                    self.cycle();
                    false
                }
            };

            self.forward_events();

            if stop {
                break;
            }
        }

        let final_active = self.coordinator.active();
        let released = self.coordinator.teardown();
        self.forward_events();

        let stats = self.coordinator.stats();
        info!(
            "Feed session stopped after {} cycles ({} coalesced triggers, {} failures)",
            stats.cycles, self.coalesced, stats.command_failures
        );

        SessionSummary {
            cycles: stats.cycles,
            coalesced_triggers: self.coalesced,
            command_failures: stats.command_failures,
            released,
            final_active,
        }
    }

    /// Apply `first` and everything already queued behind it, then run at most
    /// one cycle. Returns true when the session should stop.
    fn handle_batch(&mut self, first: FeedCommand) -> bool {
        let mut triggers = 0u64;
        let mut next = Some(first);

        while let Some(command) = next.take() {
            // Replies must reflect every trigger queued ahead of them
            if command.observes_state() {
                self.flush(&mut triggers);
            }

            match self.apply(command) {
                Flow::Continue => {}
                Flow::Cycle => triggers += 1,
                Flow::Stop => return true,
            }
            next = self.commands.try_recv().ok();
        }

        self.flush(&mut triggers);
        false
    }

    fn flush(&mut self, triggers: &mut u64) {
        if *triggers > 0 {
            self.coalesced += *triggers - 1;
            *triggers = 0;
            self.cycle();
        }
    }

    fn apply(&mut self, command: FeedCommand) -> Flow {
        match command {
            FeedCommand::Layout { card, top, height } => {
                self.coordinator.record_geometry(card, top, height);
                Flow::Continue
            }
            FeedCommand::Mount { card, reply } => {
                let outcome = self.coordinator.on_mount(card).map(|mounted| mounted.outcome);
                let _ = reply.send(outcome);
                Flow::Continue
            }
            FeedCommand::Unmount(card) => {
                self.coordinator.on_unmount(card);
                Flow::Continue
            }
            FeedCommand::Viewability(changes) => {
                self.coordinator.record_viewability(&changes);
                Flow::Cycle
            }
            FeedCommand::Notice(notice) => {
                self.coordinator.handle_notice(notice);
                Flow::Continue
            }
            FeedCommand::ViewportHeight(height) => {
                self.coordinator.set_viewport_height(height);
                Flow::Continue
            }
            FeedCommand::SetMuted(muted) => {
                self.coordinator.set_muted(muted);
                Flow::Continue
            }
            FeedCommand::PauseActive { reply } => {
                let _ = reply.send(self.coordinator.pause_active());
                Flow::Continue
            }
            FeedCommand::Resume => {
                self.coordinator.resume();
                Flow::Cycle
            }
            FeedCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
                Flow::Continue
            }
            FeedCommand::Shutdown => Flow::Stop,
        }
    }

    fn cycle(&mut self) {
        let offset = *self.scroll.borrow_and_update();
        self.coordinator.record_scroll(offset);

        let report = self.coordinator.run_cycle();
        if report.changed() {
            debug!("Cycle switched active card {} -> {}", report.previous, report.active);
        }
    }

    fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            active: self.coordinator.active(),
            states: self.coordinator.states(),
            scroll_offset: self.coordinator.tracker().scroll().offset,
            suspended: self.coordinator.is_suspended(),
            cycles: self.coordinator.stats().cycles,
        }
    }

    fn forward_events(&mut self) {
        for event in self.coordinator.drain_events() {
            // Nobody listening is fine
            let _ = self.events.send(event);
        }
    }
}
