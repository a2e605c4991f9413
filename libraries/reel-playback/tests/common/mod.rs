//! Shared test players
//!
//! `RecordingFactory` hands out players that log every call into one shared
//! journal, so tests can assert on exactly what each card's player received.

#![allow(dead_code)]

use reel_core::{Card, CardId, CommandStatus, HandleError, PlaybackHandle};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

/// Route coordinator logs to the test output
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// One call made on a player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Play,
    Pause,
    Looping(bool),
    Muted(bool),
    Release,
}

#[derive(Default)]
struct Shared {
    journal: Vec<(CardId, Call)>,
    playing: HashSet<CardId>,
    reject_play: HashSet<CardId>,
    pending: bool,
    created: usize,
}

/// Journal shared by every player a factory creates
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Shared>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory producing recording players
    pub fn factory(&self) -> RecordingFactory {
        RecordingFactory(self.clone())
    }

    /// Every call, in order
    pub fn journal(&self) -> Vec<(CardId, Call)> {
        self.0.lock().unwrap().journal.clone()
    }

    /// Calls received by one card's player
    pub fn calls(&self, card: u64) -> Vec<Call> {
        self.journal()
            .into_iter()
            .filter(|(id, _)| *id == CardId::new(card))
            .map(|(_, call)| call)
            .collect()
    }

    pub fn count(&self, card: u64, call: Call) -> usize {
        self.calls(card).into_iter().filter(|c| *c == call).count()
    }

    /// Cards whose players are actually playing
    pub fn playing(&self) -> Vec<CardId> {
        let mut playing: Vec<_> = self.0.lock().unwrap().playing.iter().copied().collect();
        playing.sort();
        playing
    }

    pub fn created(&self) -> usize {
        self.0.lock().unwrap().created
    }

    /// Make `card`'s player reject play until `allow_play` is called
    pub fn reject_play(&self, card: u64) {
        self.0.lock().unwrap().reject_play.insert(CardId::new(card));
    }

    pub fn allow_play(&self, card: u64) {
        self.0.lock().unwrap().reject_play.remove(&CardId::new(card));
    }

    /// Make commands answer `Pending` instead of `Done`
    pub fn set_pending(&self, pending: bool) {
        self.0.lock().unwrap().pending = pending;
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().journal.clear();
    }
}

pub struct RecordingFactory(Recorder);

impl reel_core::HandleFactory for RecordingFactory {
    fn create(&mut self, card: &Card) -> Result<Box<dyn PlaybackHandle>, HandleError> {
        self.0 .0.lock().unwrap().created += 1;
        Ok(Box::new(RecordingHandle {
            card: card.id,
            recorder: self.0.clone(),
        }))
    }
}

pub struct RecordingHandle {
    card: CardId,
    recorder: Recorder,
}

impl RecordingHandle {
    fn record(&self, call: Call) {
        self.recorder.0.lock().unwrap().journal.push((self.card, call));
    }
}

impl PlaybackHandle for RecordingHandle {
    fn play(&mut self) -> Result<CommandStatus, HandleError> {
        self.record(Call::Play);
        let mut shared = self.recorder.0.lock().unwrap();
        if shared.reject_play.contains(&self.card) {
            return Err(HandleError::NotReady);
        }
        shared.playing.insert(self.card);
        Ok(if shared.pending {
            CommandStatus::Pending
        } else {
            CommandStatus::Done
        })
    }

    fn pause(&mut self) -> Result<CommandStatus, HandleError> {
        self.record(Call::Pause);
        let mut shared = self.recorder.0.lock().unwrap();
        shared.playing.remove(&self.card);
        Ok(if shared.pending {
            CommandStatus::Pending
        } else {
            CommandStatus::Done
        })
    }

    fn set_looping(&mut self, looping: bool) {
        self.record(Call::Looping(looping));
    }

    fn set_muted(&mut self, muted: bool) {
        self.record(Call::Muted(muted));
    }

    fn is_playing(&self) -> bool {
        self.recorder.0.lock().unwrap().playing.contains(&self.card)
    }

    fn release(&mut self) {
        self.record(Call::Release);
    }
}

pub fn card(id: u64) -> Card {
    Card::new(CardId::new(id), format!("clip-{}.mp4", id), format!("Clip {}", id))
}

/// Cards of height 500 stacked every 600 units, tops at 0, 600, 1200, ...
pub fn feed_top(id: u64) -> f64 {
    id as f64 * 600.0
}

pub const CARD_HEIGHT: f64 = 500.0;
