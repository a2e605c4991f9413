/// ID types for Reel feed entities
use serde::{Deserialize, Serialize};
use std::fmt;

/// Card identifier
///
/// The stable index (or key) of a card within its list. Ordering matters: when
/// two cards are equally visible the lower identifier wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(u64);

impl CardId {
    /// Create a new card ID
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner value
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CardId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Opaque media locator handed to the host player (URL, asset name, bundle path)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRef(String);

impl SourceRef {
    /// Create a new source reference
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SourceRef {
    fn from(source: &str) -> Self {
        Self(source.to_string())
    }
}

impl From<String> for SourceRef {
    fn from(source: String) -> Self {
        Self(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_ids_order_by_index() {
        let mut ids = vec![CardId::new(7), CardId::new(0), CardId::new(3)];
        ids.sort();
        assert_eq!(ids, vec![CardId::new(0), CardId::new(3), CardId::new(7)]);
    }

    #[test]
    fn card_id_serializes_transparently() {
        let json = serde_json::to_string(&CardId::new(12)).unwrap();
        assert_eq!(json, "12");

        let source: SourceRef = serde_json::from_str("\"clip.mp4\"").unwrap();
        assert_eq!(source.as_str(), "clip.mp4");
    }
}
