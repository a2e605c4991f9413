//! Handle registry
//!
//! One slot per mounted card. A slot owns the card's player and serializes
//! commands to it: while a command is pending (the player answered
//! `CommandStatus::Pending`) nothing else is sent, and only the most recent
//! follow-up request is kept for when the player settles.

use crate::types::HandleState;
use reel_core::{Card, CardId, CommandStatus, HandleError, PlaybackCommand, PlaybackHandle};
use std::collections::BTreeMap;

/// Result of asking a slot to reach a state
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Dispatch {
    /// A command was sent to the player
    Issued(PlaybackCommand),
    /// The slot was already in (or already heading to) the requested state
    Unchanged,
    /// The player is busy; the request waits for it to settle
    Deferred,
    /// The player rejected the command
    Failed(PlaybackCommand, HandleError),
}

pub(crate) struct Slot {
    card: Card,
    handle: Box<dyn PlaybackHandle>,
    state: HandleState,
    in_flight: Option<PlaybackCommand>,
    queued: Option<PlaybackCommand>,
}

impl Slot {
    pub(crate) fn new(card: Card, handle: Box<dyn PlaybackHandle>) -> Self {
        Self {
            card,
            handle,
            state: HandleState::Paused,
            in_flight: None,
            queued: None,
        }
    }

    pub(crate) fn card(&self) -> &Card {
        &self.card
    }

    pub(crate) fn state(&self) -> HandleState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub(crate) fn handle_mut(&mut self) -> &mut dyn PlaybackHandle {
        self.handle.as_mut()
    }

    /// Move the slot toward the state `command` produces
    pub(crate) fn drive(&mut self, command: PlaybackCommand) -> Dispatch {
        let target = target_state(command);

        if let Some(pending) = self.in_flight {
            self.state = target;
            if pending == command {
                self.queued = None;
                return Dispatch::Unchanged;
            }
            self.queued = Some(command);
            return Dispatch::Deferred;
        }

        if self.state == target {
            return Dispatch::Unchanged;
        }

        self.issue(command)
    }

    /// Apply a settled notification from the player
    ///
    /// Returns the dispatch of a queued follow-up command, if one was waiting.
    pub(crate) fn settle(&mut self, playing: bool) -> Option<Dispatch> {
        self.in_flight = None;

        let observed = if playing {
            HandleState::Playing
        } else {
            HandleState::Paused
        };

        match self.queued.take() {
            Some(command) if target_state(command) != observed => Some(self.issue(command)),
            Some(_) | None => {
                self.state = observed;
                None
            }
        }
    }

    /// Apply an asynchronous failure reported by the player
    pub(crate) fn fail(&mut self) -> Option<Dispatch> {
        self.in_flight = None;
        self.state = HandleState::Idle;
        self.queued.take().map(|command| self.issue(command))
    }

    /// Final pause before the slot is dropped on unmount
    ///
    /// Pauses unless the player is already paused or a pause is pending.
    pub(crate) fn pause_for_release(&mut self) -> Option<Result<(), HandleError>> {
        let needs_pause = match self.in_flight {
            Some(PlaybackCommand::Pause) => false,
            Some(PlaybackCommand::Play) => true,
            None => self.state != HandleState::Paused || self.handle.is_playing(),
        };

        if !needs_pause {
            return None;
        }

        Some(self.handle.pause().map(|_| ()))
    }

    /// Unconditional pause used when the whole list is torn down
    pub(crate) fn pause_for_teardown(&mut self) -> Result<(), HandleError> {
        self.in_flight = None;
        self.queued = None;
        self.state = HandleState::Paused;
        self.handle.pause().map(|_| ())
    }

    pub(crate) fn release(mut self) {
        self.handle.release();
    }

    fn issue(&mut self, command: PlaybackCommand) -> Dispatch {
        let result = match command {
            PlaybackCommand::Play => self.handle.play(),
            PlaybackCommand::Pause => self.handle.pause(),
        };

        match result {
            Ok(CommandStatus::Done) => {
                self.state = target_state(command);
                Dispatch::Issued(command)
            }
            Ok(CommandStatus::Pending) => {
                self.state = target_state(command);
                self.in_flight = Some(command);
                Dispatch::Issued(command)
            }
            Err(error) => {
                self.state = HandleState::Idle;
                Dispatch::Failed(command, error)
            }
        }
    }
}

fn target_state(command: PlaybackCommand) -> HandleState {
    match command {
        PlaybackCommand::Play => HandleState::Playing,
        PlaybackCommand::Pause => HandleState::Paused,
    }
}

/// Card to slot mapping, ordered by card id
#[derive(Default)]
pub(crate) struct HandleRegistry {
    pub(crate) slots: BTreeMap<CardId, Slot>,
}

impl HandleRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get_mut(&mut self, card: CardId) -> Option<&mut Slot> {
        self.slots.get_mut(&card)
    }

    pub(crate) fn remove(&mut self, card: CardId) -> Option<Slot> {
        self.slots.remove(&card)
    }

    pub(crate) fn contains(&self, card: CardId) -> bool {
        self.slots.contains_key(&card)
    }

    pub(crate) fn state_of(&self, card: CardId) -> Option<HandleState> {
        self.slots.get(&card).map(Slot::state)
    }

    pub(crate) fn states(&self) -> Vec<(CardId, HandleState)> {
        self.slots
            .iter()
            .map(|(&card, slot)| (card, slot.state()))
            .collect()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (CardId, &mut Slot)> + '_ {
        self.slots.iter_mut().map(|(&card, slot)| (card, slot))
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = (CardId, Slot)> {
        std::mem::take(&mut self.slots).into_iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Calls {
        play: usize,
        pause: usize,
        released: bool,
    }

    struct ScriptedHandle {
        calls: Arc<Mutex<Calls>>,
        status: CommandStatus,
        reject_play: bool,
        playing: bool,
    }

    impl PlaybackHandle for ScriptedHandle {
        fn play(&mut self) -> Result<CommandStatus, HandleError> {
            self.calls.lock().unwrap().play += 1;
            if self.reject_play {
                return Err(HandleError::NotReady);
            }
            self.playing = true;
            Ok(self.status)
        }

        fn pause(&mut self) -> Result<CommandStatus, HandleError> {
            self.calls.lock().unwrap().pause += 1;
            self.playing = false;
            Ok(self.status)
        }

        fn set_looping(&mut self, _looping: bool) {}

        fn set_muted(&mut self, _muted: bool) {}

        fn is_playing(&self) -> bool {
            self.playing
        }

        fn release(&mut self) {
            self.calls.lock().unwrap().released = true;
        }
    }

    fn slot(status: CommandStatus, reject_play: bool) -> (Slot, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let handle = ScriptedHandle {
            calls: Arc::clone(&calls),
            status,
            reject_play,
            playing: false,
        };
        let card = Card::new(CardId::new(0), "clip.mp4", "Clip");
        (Slot::new(card, Box::new(handle)), calls)
    }

    #[test]
    fn new_slot_starts_paused_without_commands() {
        let (mut slot, calls) = slot(CommandStatus::Done, false);
        assert_eq!(slot.state(), HandleState::Paused);

        assert_eq!(slot.drive(PlaybackCommand::Pause), Dispatch::Unchanged);
        assert_eq!(calls.lock().unwrap().pause, 0);
    }

    #[test]
    fn synchronous_play_then_pause() {
        let (mut slot, calls) = slot(CommandStatus::Done, false);

        assert_eq!(
            slot.drive(PlaybackCommand::Play),
            Dispatch::Issued(PlaybackCommand::Play)
        );
        assert_eq!(slot.state(), HandleState::Playing);
        assert_eq!(slot.drive(PlaybackCommand::Play), Dispatch::Unchanged);

        assert_eq!(
            slot.drive(PlaybackCommand::Pause),
            Dispatch::Issued(PlaybackCommand::Pause)
        );
        assert_eq!(slot.drive(PlaybackCommand::Pause), Dispatch::Unchanged);

        let calls = calls.lock().unwrap();
        assert_eq!((calls.play, calls.pause), (1, 1));
    }

    #[test]
    fn pending_command_blocks_further_commands() {
        let (mut slot, calls) = slot(CommandStatus::Pending, false);

        slot.drive(PlaybackCommand::Play);
        assert!(slot.is_busy());

        // Pause requested while play is still pending: held back
        assert_eq!(slot.drive(PlaybackCommand::Pause), Dispatch::Deferred);
        assert_eq!(slot.state(), HandleState::Paused);
        assert_eq!(calls.lock().unwrap().pause, 0);

        // Player confirms it is playing; the queued pause goes out now
        let follow_up = slot.settle(true);
        assert_eq!(follow_up, Some(Dispatch::Issued(PlaybackCommand::Pause)));
        assert_eq!(calls.lock().unwrap().pause, 1);
    }

    #[test]
    fn request_reverted_while_pending_is_dropped() {
        let (mut slot, calls) = slot(CommandStatus::Pending, false);

        slot.drive(PlaybackCommand::Play);
        assert_eq!(slot.drive(PlaybackCommand::Pause), Dispatch::Deferred);
        assert_eq!(slot.drive(PlaybackCommand::Play), Dispatch::Unchanged);

        assert_eq!(slot.settle(true), None);
        assert_eq!(slot.state(), HandleState::Playing);
        assert_eq!(calls.lock().unwrap().pause, 0);
    }

    #[test]
    fn rejected_play_leaves_slot_idle() {
        let (mut slot, _calls) = slot(CommandStatus::Done, true);

        assert_eq!(
            slot.drive(PlaybackCommand::Play),
            Dispatch::Failed(PlaybackCommand::Play, HandleError::NotReady)
        );
        assert_eq!(slot.state(), HandleState::Idle);
    }

    #[test]
    fn async_failure_marks_idle() {
        let (mut slot, _calls) = slot(CommandStatus::Pending, false);
        slot.drive(PlaybackCommand::Play);

        assert_eq!(slot.fail(), None);
        assert_eq!(slot.state(), HandleState::Idle);
        assert!(!slot.is_busy());
    }

    #[test]
    fn unsolicited_settle_records_observed_state() {
        let (mut slot, _calls) = slot(CommandStatus::Done, false);

        // Player started on its own (native controls)
        assert_eq!(slot.settle(true), None);
        assert_eq!(slot.state(), HandleState::Playing);
    }

    #[test]
    fn release_pauses_only_when_needed() {
        let (mut paused, calls) = slot(CommandStatus::Done, false);
        assert_eq!(paused.pause_for_release(), None);
        paused.release();
        assert_eq!(calls.lock().unwrap().pause, 0);
        assert!(calls.lock().unwrap().released);

        let (mut playing, calls) = slot(CommandStatus::Done, false);
        playing.drive(PlaybackCommand::Play);
        assert_eq!(playing.pause_for_release(), Some(Ok(())));
        assert_eq!(calls.lock().unwrap().pause, 1);
    }

    #[test]
    fn registry_tracks_states_in_card_order() {
        let mut registry = HandleRegistry::new();
        for id in [2, 0, 1] {
            let (mut slot, _calls) = slot(CommandStatus::Done, false);
            slot.card = Card::new(CardId::new(id), "clip.mp4", "Clip");
            registry.slots.insert(CardId::new(id), slot);
        }

        registry
            .get_mut(CardId::new(1))
            .unwrap()
            .drive(PlaybackCommand::Play);

        assert_eq!(
            registry.states(),
            vec![
                (CardId::new(0), HandleState::Paused),
                (CardId::new(1), HandleState::Playing),
                (CardId::new(2), HandleState::Paused),
            ]
        );
        assert!(registry.contains(CardId::new(2)));
        assert!(registry.remove(CardId::new(2)).is_some());
        assert_eq!(registry.len(), 2);
    }
}
