use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::PartId;

/// Freshness of a part's stored embedding relative to its description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmbeddingStatus {
    /// No embedding has ever been stored.
    Absent,
    /// An embedding exists but was computed from a different description.
    Stale,
    /// The embedding was computed from the current description.
    Fresh,
}

impl EmbeddingStatus {
    /// Derive the status from the stored columns.
    ///
    /// `embedded_description` is the text that produced the stored vector;
    /// it is cleared whenever the description is written.
    #[must_use]
    pub fn from_columns(
        has_embedding: bool,
        embedded_description: Option<&str>,
        description: &str,
    ) -> Self {
        match (has_embedding, embedded_description) {
            (false, _) => Self::Absent,
            (true, Some(source)) if source == description => Self::Fresh,
            (true, _) => Self::Stale,
        }
    }

    /// Whether the synchronizer should (re)compute this part's embedding.
    #[must_use]
    pub const fn needs_sync(self) -> bool {
        !matches!(self, Self::Fresh)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Stale => "stale",
            Self::Fresh => "fresh",
        }
    }
}

/// A physical part stored at a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    pub description: String,

    /// Name of the location holding this part.
    pub location: String,

    pub embedding_status: EmbeddingStatus,

    /// When the stored embedding was written, if ever.
    pub embedded_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A part together with its stored (possibly stale) embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedPart {
    pub part: Part,
    pub embedding: Vec<f32>,
}

/// A part whose embedding is absent or stale, as read for synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEmbedding {
    pub id: PartId,
    pub description: String,
}

/// A freshly computed embedding to write back onto a part.
///
/// `source_description` is the exact text that was embedded; the write only
/// lands if the part's description still equals it.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingUpdate {
    pub id: PartId,
    pub source_description: String,
    pub embedding: Vec<f32>,
}
