/// Simulated players
///
/// Stand-ins for platform video players. They apply every command
/// immediately, log it, and count what they received so a run can be
/// summarized afterwards.
use reel_core::{Card, CardId, CommandStatus, HandleError, HandleFactory, PlaybackHandle};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Commands one player received
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerStats {
    pub plays: u64,
    pub pauses: u64,
    pub rejected_plays: u64,
    pub released: bool,
}

/// Shared per-card statistics, filled in by every simulated player
#[derive(Debug, Clone, Default)]
pub struct PlayerLog(Arc<Mutex<BTreeMap<CardId, PlayerStats>>>);

impl PlayerLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all statistics, ordered by card
    pub fn snapshot(&self) -> BTreeMap<CardId, PlayerStats> {
        self.lock().clone()
    }

    fn update(&self, card: CardId, f: impl FnOnce(&mut PlayerStats)) {
        f(self.lock().entry(card).or_default());
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<CardId, PlayerStats>> {
        // Counters stay meaningful even if a holder panicked
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Creates simulated players; cards in `failing` reject every play
pub struct SimulatedFactory {
    log: PlayerLog,
    failing: HashSet<CardId>,
}

impl SimulatedFactory {
    pub fn new(log: PlayerLog) -> Self {
        Self {
            log,
            failing: HashSet::new(),
        }
    }

    /// Make `card`'s player reject play
    pub fn failing(mut self, card: CardId) -> Self {
        self.failing.insert(card);
        self
    }
}

impl HandleFactory for SimulatedFactory {
    fn create(&mut self, card: &Card) -> Result<Box<dyn PlaybackHandle>, HandleError> {
        debug!("Creating simulated player for {} ({})", card.id, card.source);
        self.log.update(card.id, |_| {});

        Ok(Box::new(SimulatedPlayer {
            card: card.id,
            title: card.title.clone(),
            playing: false,
            reject_play: self.failing.contains(&card.id),
            log: self.log.clone(),
        }))
    }
}

pub struct SimulatedPlayer {
    card: CardId,
    title: String,
    playing: bool,
    reject_play: bool,
    log: PlayerLog,
}

impl PlaybackHandle for SimulatedPlayer {
    fn play(&mut self) -> Result<CommandStatus, HandleError> {
        if self.reject_play {
            self.log.update(self.card, |stats| stats.rejected_plays += 1);
            return Err(HandleError::resource("simulated decoder failure"));
        }

        info!("▶ {} ({})", self.card, self.title);
        self.playing = true;
        self.log.update(self.card, |stats| stats.plays += 1);
        Ok(CommandStatus::Done)
    }

    fn pause(&mut self) -> Result<CommandStatus, HandleError> {
        info!("⏸ {} ({})", self.card, self.title);
        self.playing = false;
        self.log.update(self.card, |stats| stats.pauses += 1);
        Ok(CommandStatus::Done)
    }

    fn set_looping(&mut self, looping: bool) {
        debug!("{} looping: {}", self.card, looping);
    }

    fn set_muted(&mut self, muted: bool) {
        debug!("{} muted: {}", self.card, muted);
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn release(&mut self) {
        debug!("Released player for {}", self.card);
        self.log.update(self.card, |stats| stats.released = true);
    }
}
