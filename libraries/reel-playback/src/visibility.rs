//! Visibility tracking
//!
//! Keeps the latest layout of every card and the list's scroll offset, and
//! turns them into visible fractions on demand. Recording is cheap enough to
//! run on every scroll frame; all the arithmetic happens when a decision cycle
//! asks for fractions.

use reel_core::{CardGeometry, CardId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Current scroll position of a list
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollState {
    /// Content offset of the viewport's top edge
    pub offset: f64,
}

/// One entry of a host viewability notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewabilityChange {
    /// Card whose viewability changed
    pub card: CardId,

    /// Whether the host now considers it viewable
    pub is_viewable: bool,
}

impl ViewabilityChange {
    /// Create a new viewability change
    pub fn new(card: CardId, is_viewable: bool) -> Self {
        Self { card, is_viewable }
    }
}

/// Tracks card geometry and scroll offset for one list
#[derive(Debug, Clone, Default)]
pub struct VisibilityTracker {
    geometry: HashMap<CardId, CardGeometry>,
    scroll: ScrollState,
    /// Last viewability the host reported; absent means viewable
    viewability: HashMap<CardId, bool>,
}

impl VisibilityTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a card's layout, replacing any previous geometry
    pub fn record_geometry(&mut self, card: CardId, top: f64, height: f64) {
        self.geometry.insert(card, CardGeometry::new(top, height));
    }

    /// Record the list's scroll offset
    ///
    /// Non-finite offsets are ignored.
    #[inline]
    pub fn record_scroll(&mut self, offset: f64) {
        if offset.is_finite() {
            self.scroll.offset = offset;
        }
    }

    /// Apply a host viewability notification
    pub fn apply_viewability(&mut self, changes: &[ViewabilityChange]) {
        for change in changes {
            self.viewability.insert(change.card, change.is_viewable);
        }
    }

    /// Drop everything known about a card
    pub fn forget(&mut self, card: CardId) {
        self.geometry.remove(&card);
        self.viewability.remove(&card);
    }

    /// Current scroll state
    pub fn scroll(&self) -> ScrollState {
        self.scroll
    }

    /// Last recorded geometry for a card
    pub fn geometry(&self, card: CardId) -> Option<CardGeometry> {
        self.geometry.get(&card).copied()
    }

    /// Number of cards with recorded geometry
    pub fn tracked_len(&self) -> usize {
        self.geometry.len()
    }

    /// Fraction of the card's height inside `[offset, offset + viewport_height]`
    ///
    /// Returns 0.0 when the geometry is unknown or unmeasurable, when the
    /// viewport is degenerate, or when the host last declared the card not
    /// viewable.
    pub fn visible_fraction(&self, card: CardId, viewport_height: f64) -> f64 {
        if self.viewability.get(&card) == Some(&false) {
            return 0.0;
        }

        match self.geometry.get(&card) {
            Some(geometry) => overlap_fraction(geometry, self.scroll.offset, viewport_height),
            None => 0.0,
        }
    }

    /// Visible fraction of every tracked card, ordered by card
    pub fn fractions(&self, viewport_height: f64) -> BTreeMap<CardId, f64> {
        self.geometry
            .keys()
            .map(|&card| (card, self.visible_fraction(card, viewport_height)))
            .collect()
    }
}

fn overlap_fraction(geometry: &CardGeometry, offset: f64, viewport_height: f64) -> f64 {
    if !geometry.is_measurable() || !viewport_height.is_finite() || viewport_height <= 0.0 {
        return 0.0;
    }

    let visible_start = geometry.top.max(offset);
    let visible_end = geometry.bottom().min(offset + viewport_height);
    let visible_height = (visible_end - visible_start).max(0.0);

    (visible_height / geometry.height).clamp(0.0, 1.0)
}
