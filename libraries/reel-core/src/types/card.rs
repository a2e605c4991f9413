/// Feed card
use super::ids::{CardId, SourceRef};
use serde::{Deserialize, Serialize};

/// One list item: a single video plus its display chrome
///
/// Cards are immutable once created. When a card scrolls far enough out of the
/// render window the host recycles it and a new `Card` is built on remount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Stable identity within the list
    pub id: CardId,

    /// Media locator for the player
    pub source: SourceRef,

    /// Display title (product name, caption)
    pub title: String,
}

impl Card {
    /// Create a new card
    pub fn new(id: CardId, source: impl Into<SourceRef>, title: impl Into<String>) -> Self {
        Self {
            id,
            source: source.into(),
            title: title.into(),
        }
    }
}
