//! Activation policy
//!
//! Picks the single card that should play from a snapshot of visible
//! fractions. The decision is a pure function of its inputs:
//!
//! 1. The most visible card is the candidate; ties go to the lowest card id,
//!    so scroll direction never changes the outcome.
//! 2. Nothing plays if the candidate is below `min_fraction`.
//! 3. The current active card keeps playing while it stays at or above
//!    `min_fraction` and the candidate beats it by no more than
//!    `hysteresis_margin`. This stops two cards straddling a boundary from
//!    trading places every cycle.

use reel_core::{ActiveCard, CardId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Slack on the margin comparison; layout fractions like 0.8 - 0.7 do not
/// subtract to exactly 0.1
const MARGIN_EPSILON: f64 = 1e-9;

/// Threshold plus hysteresis selection of the active card
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivationPolicy {
    /// Minimum visible fraction for any card to play
    pub min_fraction: f64,

    /// Lead a challenger needs over a still-eligible active card
    pub hysteresis_margin: f64,
}

impl Default for ActivationPolicy {
    fn default() -> Self {
        Self {
            min_fraction: 0.6,
            hysteresis_margin: 0.1,
        }
    }
}

impl ActivationPolicy {
    /// Create a policy
    pub fn new(min_fraction: f64, hysteresis_margin: f64) -> Self {
        Self {
            min_fraction,
            hysteresis_margin,
        }
    }

    /// Decide which card should be active
    pub fn decide(&self, fractions: &BTreeMap<CardId, f64>, current: ActiveCard) -> ActiveCard {
        let Some((best, best_fraction)) = most_visible(fractions) else {
            return ActiveCard::None;
        };

        if best_fraction < self.min_fraction {
            return ActiveCard::None;
        }

        if let ActiveCard::Card(current_id) = current {
            let current_fraction = sanitize(fractions.get(&current_id).copied().unwrap_or(0.0));
            if current_fraction >= self.min_fraction
                && best_fraction - current_fraction <= self.hysteresis_margin + MARGIN_EPSILON
            {
                return current;
            }
        }

        ActiveCard::Card(best)
    }
}

/// Highest fraction; the first (lowest) id wins a tie
fn most_visible(fractions: &BTreeMap<CardId, f64>) -> Option<(CardId, f64)> {
    let mut best: Option<(CardId, f64)> = None;

    for (&card, &fraction) in fractions {
        let fraction = sanitize(fraction);
        match best {
            Some((_, best_fraction)) if fraction <= best_fraction => {}
            _ => best = Some((card, fraction)),
        }
    }

    best
}

#[inline]
fn sanitize(fraction: f64) -> f64 {
    if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fractions(pairs: &[(u64, f64)]) -> BTreeMap<CardId, f64> {
        pairs
            .iter()
            .map(|&(id, fraction)| (CardId::new(id), fraction))
            .collect()
    }

    fn policy(min_fraction: f64) -> ActivationPolicy {
        ActivationPolicy::new(min_fraction, 0.1)
    }

    #[test]
    fn most_visible_card_above_threshold_wins() {
        let decided = policy(0.5).decide(&fractions(&[(0, 0.8), (1, 0.4)]), ActiveCard::None);
        assert_eq!(decided, ActiveCard::Card(CardId::new(0)));
    }

    #[test]
    fn nothing_plays_below_threshold() {
        let decided = policy(0.5).decide(&fractions(&[(0, 0.45), (1, 0.3)]), ActiveCard::None);
        assert_eq!(decided, ActiveCard::None);
    }

    #[test]
    fn empty_snapshot_clears_active() {
        let decided = policy(0.5).decide(&BTreeMap::new(), ActiveCard::Card(CardId::new(3)));
        assert_eq!(decided, ActiveCard::None);
    }

    #[test]
    fn threshold_is_inclusive() {
        let decided = policy(0.6).decide(&fractions(&[(4, 0.6)]), ActiveCard::None);
        assert_eq!(decided, ActiveCard::Card(CardId::new(4)));
    }

    #[test]
    fn tie_goes_to_lowest_id() {
        let snapshot = fractions(&[(2, 0.7), (1, 0.7), (3, 0.7)]);
        let decided = policy(0.5).decide(&snapshot, ActiveCard::None);
        assert_eq!(decided, ActiveCard::Card(CardId::new(1)));
    }

    #[test]
    fn hysteresis_keeps_current_within_margin() {
        // A at 55%, B at 60%: B's lead is inside the 10% margin
        let snapshot = fractions(&[(0, 0.55), (1, 0.60)]);
        let decided = policy(0.5).decide(&snapshot, ActiveCard::Card(CardId::new(0)));
        assert_eq!(decided, ActiveCard::Card(CardId::new(0)));
    }

    #[test]
    fn challenger_beyond_margin_takes_over() {
        let snapshot = fractions(&[(0, 0.55), (1, 0.70)]);
        let decided = policy(0.5).decide(&snapshot, ActiveCard::Card(CardId::new(0)));
        assert_eq!(decided, ActiveCard::Card(CardId::new(1)));
    }

    #[test]
    fn lead_of_exactly_the_margin_keeps_current() {
        // 350/500 vs 400/500 and 0.55 vs 0.65 both lead by exactly 0.1
        for (current, challenger) in [(0.7, 0.8), (0.55, 0.65), (0.6, 0.7)] {
            let snapshot = fractions(&[(0, current), (1, challenger)]);
            let decided = policy(0.5).decide(&snapshot, ActiveCard::Card(CardId::new(0)));
            assert_eq!(decided, ActiveCard::Card(CardId::new(0)), "{} vs {}", current, challenger);
        }

        let snapshot = fractions(&[(0, 0.7), (1, 0.8 + 1e-6)]);
        let decided = policy(0.5).decide(&snapshot, ActiveCard::Card(CardId::new(0)));
        assert_eq!(decided, ActiveCard::Card(CardId::new(1)));
    }

    #[test]
    fn current_below_threshold_loses_hysteresis() {
        let snapshot = fractions(&[(0, 0.45), (1, 0.52)]);
        let decided = policy(0.5).decide(&snapshot, ActiveCard::Card(CardId::new(0)));
        assert_eq!(decided, ActiveCard::Card(CardId::new(1)));
    }

    #[test]
    fn current_missing_from_snapshot_is_replaced() {
        let snapshot = fractions(&[(1, 0.9)]);
        let decided = policy(0.5).decide(&snapshot, ActiveCard::Card(CardId::new(0)));
        assert_eq!(decided, ActiveCard::Card(CardId::new(1)));
    }

    #[test]
    fn hysteresis_beats_tie_break() {
        // Equal visibility: the lower id would win a cold decision, but the
        // active card holds
        let snapshot = fractions(&[(0, 0.8), (1, 0.8)]);
        let decided = policy(0.5).decide(&snapshot, ActiveCard::Card(CardId::new(1)));
        assert_eq!(decided, ActiveCard::Card(CardId::new(1)));
    }

    #[test]
    fn non_finite_fractions_count_as_zero() {
        let snapshot = fractions(&[(0, f64::NAN), (1, 0.7), (2, f64::INFINITY)]);
        let decided = policy(0.5).decide(&snapshot, ActiveCard::None);
        assert_eq!(decided, ActiveCard::Card(CardId::new(1)));
    }

    #[test]
    fn decide_is_idempotent() {
        let snapshot = fractions(&[(0, 0.62), (1, 0.66), (2, 0.1)]);
        let current = ActiveCard::Card(CardId::new(0));
        let policy = policy(0.6);

        let first = policy.decide(&snapshot, current);
        let second = policy.decide(&snapshot, current);
        assert_eq!(first, second);
    }
}
