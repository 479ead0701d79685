//! Part search for partdb.
//!
//! Two retrieval modes over the same store: lexical search through the FTS5
//! index on part descriptions, and semantic search ranking stored embeddings
//! by cosine similarity to an embedded query.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod engine;
pub mod error;
pub mod metric;
pub mod query;

pub use engine::{SearchEngine, SearchHit, SearchMode};
pub use error::{SearchError, SearchResult};
