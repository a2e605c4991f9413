//! Card lifecycle management
//!
//! Creates a player when a card mounts and guarantees its release when the
//! card unmounts. Lists deliver redundant lifecycle callbacks (double mounts,
//! unmounts for recycled rows), so every inconsistency is a logged no-op.

use crate::registry::{HandleRegistry, Slot};
use reel_core::{Card, CardId, HandleFactory, PlaybackHandle, ReelError, Result};
use std::collections::btree_map::Entry;
use tracing::{debug, info, warn};

/// What `on_mount` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    /// A new player was created and registered
    Registered,

    /// The card was already mounted with the same source
    AlreadyMounted,

    /// The card was already mounted with a different source; the existing
    /// player was kept
    SourceConflict,
}

/// Result of a successful mount
#[derive(Debug)]
pub struct Mounted<'a> {
    /// What happened
    pub outcome: MountOutcome,

    /// The card's player
    pub handle: &'a mut dyn PlaybackHandle,
}

/// What `on_unmount` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmountOutcome {
    /// The player was paused (if needed) and released
    Released,

    /// No player was registered for the card
    NotMounted,
}

/// Owns the handle registry and the factory that fills it
pub struct CardLifecycleManager {
    factory: Box<dyn HandleFactory>,
    registry: HandleRegistry,
    muted: bool,
}

impl CardLifecycleManager {
    /// Create a manager; `muted` is the initial mute flag for new players
    pub fn new(factory: Box<dyn HandleFactory>, muted: bool) -> Self {
        Self {
            factory,
            registry: HandleRegistry::new(),
            muted,
        }
    }

    /// Create and register a player for `card`
    ///
    /// Players always loop and start paused. Mounting a card that is still
    /// mounted returns the existing player.
    ///
    /// # Errors
    /// Returns `ReelError::HandleCreation` if the factory fails; the card is
    /// left unregistered.
    pub fn on_mount(&mut self, card: Card) -> Result<Mounted<'_>> {
        match self.registry.slots.entry(card.id) {
            Entry::Occupied(entry) => {
                let slot = entry.into_mut();
                let outcome = if slot.card().source == card.source {
                    debug!("Card {} already mounted", card.id);
                    MountOutcome::AlreadyMounted
                } else {
                    warn!(
                        "Card {} remounted with source {} while {} is live; keeping the existing player",
                        card.id,
                        card.source,
                        slot.card().source
                    );
                    MountOutcome::SourceConflict
                };

                Ok(Mounted {
                    outcome,
                    handle: slot.handle_mut(),
                })
            }
            Entry::Vacant(entry) => {
                let mut handle = self
                    .factory
                    .create(&card)
                    .map_err(|source| ReelError::HandleCreation {
                        card: card.id,
                        source,
                    })?;

                handle.set_looping(true);
                handle.set_muted(self.muted);

                info!("Mounted card {} ({})", card.id, card.title);
                let slot = entry.insert(Slot::new(card, handle));

                Ok(Mounted {
                    outcome: MountOutcome::Registered,
                    handle: slot.handle_mut(),
                })
            }
        }
    }

    /// Pause (if needed) and release the player for `card`
    ///
    /// Unconditional: an active card is released like any other.
    pub fn on_unmount(&mut self, card: CardId) -> UnmountOutcome {
        let Some(mut slot) = self.registry.remove(card) else {
            warn!("Unmount for card {} which is not mounted", card);
            return UnmountOutcome::NotMounted;
        };

        if let Some(Err(e)) = slot.pause_for_release() {
            warn!("Failed to pause card {} on unmount: {}", card, e);
        }
        slot.release();

        info!("Unmounted card {}", card);
        UnmountOutcome::Released
    }

    /// Set the mute flag on every player and on future mounts
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        for (_, slot) in self.registry.iter_mut() {
            slot.handle_mut().set_muted(muted);
        }
    }

    /// Current mute flag
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Pause and release every player
    ///
    /// Each player receives exactly one pause. Returns how many were released.
    pub fn release_all(&mut self) -> usize {
        let mut released = 0;

        for (card, mut slot) in self.registry.drain() {
            if let Err(e) = slot.pause_for_teardown() {
                warn!("Failed to pause card {} during teardown: {}", card, e);
            }
            slot.release();
            released += 1;
        }

        released
    }

    /// Whether `card` has a registered player
    pub fn is_mounted(&self, card: CardId) -> bool {
        self.registry.contains(card)
    }

    /// Number of registered players
    pub fn mounted_len(&self) -> usize {
        self.registry.len()
    }

    pub(crate) fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut HandleRegistry {
        &mut self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HandleState;
    use reel_core::{CommandStatus, HandleError, PlaybackCommand};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Flags {
        looping: bool,
        muted: bool,
        pauses: usize,
        released: usize,
    }

    struct FlagHandle(Arc<Mutex<Flags>>);

    impl PlaybackHandle for FlagHandle {
        fn play(&mut self) -> std::result::Result<CommandStatus, HandleError> {
            Ok(CommandStatus::Done)
        }

        fn pause(&mut self) -> std::result::Result<CommandStatus, HandleError> {
            self.0.lock().unwrap().pauses += 1;
            Ok(CommandStatus::Done)
        }

        fn set_looping(&mut self, looping: bool) {
            self.0.lock().unwrap().looping = looping;
        }

        fn set_muted(&mut self, muted: bool) {
            self.0.lock().unwrap().muted = muted;
        }

        fn is_playing(&self) -> bool {
            false
        }

        fn release(&mut self) {
            self.0.lock().unwrap().released += 1;
        }
    }

    fn manager(muted: bool) -> (CardLifecycleManager, Arc<Mutex<Flags>>, Arc<AtomicUsize>) {
        let flags = Arc::new(Mutex::new(Flags::default()));
        let created = Arc::new(AtomicUsize::new(0));

        let factory_flags = Arc::clone(&flags);
        let factory_created = Arc::clone(&created);
        let factory = move |_card: &Card| -> std::result::Result<Box<dyn PlaybackHandle>, HandleError> {
            factory_created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FlagHandle(Arc::clone(&factory_flags))))
        };

        (CardLifecycleManager::new(Box::new(factory), muted), flags, created)
    }

    fn card(id: u64, source: &str) -> Card {
        Card::new(CardId::new(id), source, format!("Card {}", id))
    }

    #[test]
    fn mount_configures_looping_and_default_mute() {
        let (mut lifecycle, flags, _created) = manager(true);

        let mounted = lifecycle.on_mount(card(0, "a.mp4")).unwrap();
        assert_eq!(mounted.outcome, MountOutcome::Registered);

        let flags = flags.lock().unwrap();
        assert!(flags.looping);
        assert!(flags.muted);
        assert_eq!(
            lifecycle.registry().state_of(CardId::new(0)),
            Some(HandleState::Paused)
        );
    }

    #[test]
    fn double_mount_returns_existing_player() {
        let (mut lifecycle, _flags, created) = manager(false);

        lifecycle.on_mount(card(0, "a.mp4")).unwrap();
        let again = lifecycle.on_mount(card(0, "a.mp4")).unwrap();
        assert_eq!(again.outcome, MountOutcome::AlreadyMounted);

        let conflict = lifecycle.on_mount(card(0, "b.mp4")).unwrap();
        assert_eq!(conflict.outcome, MountOutcome::SourceConflict);

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(lifecycle.mounted_len(), 1);
    }

    #[test]
    fn factory_failure_leaves_card_unregistered() {
        let factory = |_card: &Card| -> std::result::Result<Box<dyn PlaybackHandle>, HandleError> {
            Err(HandleError::resource("no decoder"))
        };
        let mut lifecycle = CardLifecycleManager::new(Box::new(factory), false);

        let result = lifecycle.on_mount(card(3, "c.mp4"));
        assert!(matches!(
            result,
            Err(ReelError::HandleCreation { card, .. }) if card == CardId::new(3)
        ));
        assert!(!lifecycle.is_mounted(CardId::new(3)));
    }

    #[test]
    fn unmount_pauses_playing_player_once_and_releases() {
        let (mut lifecycle, flags, _created) = manager(false);
        lifecycle.on_mount(card(0, "a.mp4")).unwrap();
        lifecycle
            .registry_mut()
            .get_mut(CardId::new(0))
            .unwrap()
            .drive(PlaybackCommand::Play);

        assert_eq!(lifecycle.on_unmount(CardId::new(0)), UnmountOutcome::Released);
        assert!(!lifecycle.is_mounted(CardId::new(0)));

        let flags = flags.lock().unwrap();
        assert_eq!(flags.pauses, 1);
        assert_eq!(flags.released, 1);
    }

    #[test]
    fn unmount_of_unknown_card_is_a_no_op() {
        let (mut lifecycle, flags, _created) = manager(false);
        assert_eq!(
            lifecycle.on_unmount(CardId::new(42)),
            UnmountOutcome::NotMounted
        );
        assert_eq!(flags.lock().unwrap().released, 0);
    }

    #[test]
    fn set_muted_reaches_every_player() {
        let (mut lifecycle, flags, _created) = manager(false);
        lifecycle.on_mount(card(0, "a.mp4")).unwrap();

        lifecycle.set_muted(true);
        assert!(flags.lock().unwrap().muted);
        assert!(lifecycle.is_muted());
    }

    #[test]
    fn release_all_pauses_each_player_once() {
        let (mut lifecycle, flags, _created) = manager(false);
        for id in 0..3 {
            lifecycle.on_mount(card(id, "a.mp4")).unwrap();
        }

        assert_eq!(lifecycle.release_all(), 3);
        assert_eq!(lifecycle.mounted_len(), 0);

        let flags = flags.lock().unwrap();
        assert_eq!(flags.pauses, 3);
        assert_eq!(flags.released, 3);
    }
}
