/// Active card selection
use super::ids::CardId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The single card currently authorized to play, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "card")]
pub enum ActiveCard {
    /// Nothing is visible enough to play
    #[default]
    None,

    /// This card plays, every other card is paused
    Card(CardId),
}

impl ActiveCard {
    /// The active card's identity, if any
    pub fn card(self) -> Option<CardId> {
        match self {
            Self::None => None,
            Self::Card(id) => Some(id),
        }
    }

    /// Whether `id` is the active card
    pub fn is(self, id: CardId) -> bool {
        self == Self::Card(id)
    }

    /// Whether no card is active
    pub fn is_none(self) -> bool {
        self == Self::None
    }
}

impl From<Option<CardId>> for ActiveCard {
    fn from(card: Option<CardId>) -> Self {
        card.map_or(Self::None, Self::Card)
    }
}

impl fmt::Display for ActiveCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Card(id) => write!(f, "card {}", id),
        }
    }
}
