pub mod ids;
pub mod location;
pub mod part;

pub use ids::PartId;
pub use location::{EmptyNeighbours, Location};
pub use part::{EmbeddedPart, EmbeddingStatus, EmbeddingUpdate, Part, PendingEmbedding};
