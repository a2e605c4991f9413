//! Reel Simulator
//!
//! Drives a synthetic feed through `reel-playback` so coordination behaviour
//! can be watched from a terminal: which card plays, when players are paused,
//! and how failures heal.

pub mod config;
pub mod error;
pub mod player;
pub mod scenario;
