//! Search errors.

use partdb_embed::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    /// The query could not be embedded. Semantic search has no fallback.
    #[error("semantic search unavailable: {0} (try --full-text)")]
    EmbeddingUnavailable(#[source] ProviderError),

    #[error(transparent)]
    Database(#[from] partdb_core::Error),
}

pub type SearchResult<T> = std::result::Result<T, SearchError>;
