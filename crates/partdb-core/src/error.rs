use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// A location cannot be removed while parts still reference it.
    #[error("location '{location}' still holds {parts} part(s); move or delete them first")]
    ReferentialIntegrity { location: String, parts: usize },

    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl Error {
    pub(crate) fn part_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "part",
            id: id.to_string(),
        }
    }

    pub(crate) fn location_not_found(name: &str) -> Self {
        Self::NotFound {
            entity: "location",
            id: name.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
