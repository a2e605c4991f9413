/// Card layout geometry
use serde::{Deserialize, Serialize};

/// Vertical placement of a card in content coordinates
///
/// Produced by the host layout pass; `top` is measured from the start of the
/// scrollable content, not from the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CardGeometry {
    /// Distance from the top of the content to the top of the card
    pub top: f64,

    /// Laid-out height of the card
    pub height: f64,
}

impl CardGeometry {
    /// Create a new geometry
    pub const fn new(top: f64, height: f64) -> Self {
        Self { top, height }
    }

    /// Content coordinate of the card's bottom edge
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Whether the geometry can produce a meaningful visible fraction
    pub fn is_measurable(&self) -> bool {
        self.top.is_finite() && self.height.is_finite() && self.height > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_nan_heights_are_not_measurable() {
        assert!(CardGeometry::new(0.0, 500.0).is_measurable());
        assert!(!CardGeometry::new(0.0, 0.0).is_measurable());
        assert!(!CardGeometry::new(0.0, -4.0).is_measurable());
        assert!(!CardGeometry::new(f64::NAN, 500.0).is_measurable());
        assert!(!CardGeometry::new(0.0, f64::INFINITY).is_measurable());
    }
}
