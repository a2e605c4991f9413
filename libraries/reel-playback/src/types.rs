//! Core types for feed playback coordination

use crate::policy::ActivationPolicy;
use reel_core::{ReelError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback state the coordinator tracks for one registered card
///
/// This is the *requested* state. A player that has not confirmed a pending
/// command is still reported with the state it was asked to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleState {
    /// Unknown: the last command failed or the player diverged on its own.
    /// Always re-driven on the next decision cycle.
    Idle,

    /// Asked to play
    Playing,

    /// Asked to pause (initial state on registration)
    Paused,
}

impl std::fmt::Display for HandleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandleState::Idle => write!(f, "idle"),
            HandleState::Playing => write!(f, "playing"),
            HandleState::Paused => write!(f, "paused"),
        }
    }
}

/// What starts a decision cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    /// Periodic timer recomputes fractions from geometry and scroll offset
    #[default]
    Polling,

    /// Host viewability notifications run a cycle directly
    Viewability,
}

/// Configuration for a feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Minimum visible fraction for a card to play (default: 0.6)
    #[serde(default = "default_min_fraction")]
    pub min_fraction: f64,

    /// How far a challenger must out-see the active card to take over (default: 0.1)
    #[serde(default = "default_hysteresis_margin")]
    pub hysteresis_margin: f64,

    /// Viewport height in layout units (default: 800)
    #[serde(default = "default_viewport_height")]
    pub viewport_height: f64,

    /// Mute new players (default: false)
    #[serde(default)]
    pub default_muted: bool,

    /// Decision trigger (default: polling)
    #[serde(default)]
    pub trigger: TriggerMode,

    /// Polling period in milliseconds (default: 150)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl FeedConfig {
    /// Check ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.min_fraction > 0.0 && self.min_fraction <= 1.0) {
            return Err(ReelError::invalid_config(format!(
                "min_fraction must be in (0, 1], got {}",
                self.min_fraction
            )));
        }

        if !(self.hysteresis_margin >= 0.0 && self.hysteresis_margin < 1.0) {
            return Err(ReelError::invalid_config(format!(
                "hysteresis_margin must be in [0, 1), got {}",
                self.hysteresis_margin
            )));
        }

        if !(self.viewport_height.is_finite() && self.viewport_height > 0.0) {
            return Err(ReelError::invalid_config(format!(
                "viewport_height must be positive, got {}",
                self.viewport_height
            )));
        }

        if self.poll_interval_ms == 0 {
            return Err(ReelError::invalid_config(
                "poll_interval_ms must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Activation policy described by this configuration
    pub fn policy(&self) -> ActivationPolicy {
        ActivationPolicy::new(self.min_fraction, self.hysteresis_margin)
    }

    /// Polling period
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            min_fraction: default_min_fraction(),
            hysteresis_margin: default_hysteresis_margin(),
            viewport_height: default_viewport_height(),
            default_muted: false,
            trigger: TriggerMode::default(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

// Default values
fn default_min_fraction() -> f64 {
    0.6
}

fn default_hysteresis_margin() -> f64 {
    0.1
}

fn default_viewport_height() -> f64 {
    800.0
}

fn default_poll_interval_ms() -> u64 {
    150
}
