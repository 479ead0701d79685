use serde::{Deserialize, Serialize};

/// A named place that holds parts (a bin, drawer, box...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
}

impl Location {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The closest locations, by name order, that currently hold no parts.
///
/// Shown next to search hits so free space near a found part is easy to spot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyNeighbours {
    pub previous: Option<String>,
    pub next: Option<String>,
}
