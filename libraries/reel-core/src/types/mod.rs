mod active;
mod card;
mod geometry;
mod ids;

pub use active::ActiveCard;
pub use card::Card;
pub use geometry::CardGeometry;
pub use ids::{CardId, SourceRef};
