//! Reel Core
//!
//! Platform-agnostic types, capability traits, and error handling shared by
//! every Reel feed crate.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Card`, `CardId`, `CardGeometry`, `ActiveCard`
//! - **Core Traits**: `PlaybackHandle`, `HandleFactory`
//! - **Error Handling**: `HandleError` for the capability, `ReelError` and `Result` for the API
//!
//! The video engine itself (decode, render, buffering) lives on the host
//! platform. This crate only describes what the feed coordinator is allowed to
//! ask of it.
//!
//! # Example
//!
//! ```rust
//! use reel_core::{ActiveCard, Card, CardGeometry, CardId};
//!
//! let card = Card::new(CardId::new(0), "https://cdn.example.com/clip.mp4", "Sneakers");
//! let geometry = CardGeometry::new(0.0, 500.0);
//!
//! assert_eq!(geometry.bottom(), 500.0);
//! assert_eq!(ActiveCard::from(Some(card.id)).card(), Some(CardId::new(0)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{HandleError, ReelError, Result};
pub use traits::{CommandStatus, HandleFactory, HandleNotice, PlaybackCommand, PlaybackHandle};
pub use types::{ActiveCard, Card, CardGeometry, CardId, SourceRef};
