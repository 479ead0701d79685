//! Core domain model and store for partdb.
//!
//! This crate defines the part/location model, the SQLite schema (including
//! the FTS5 lexical index and the embedding column), and the store methods
//! every other crate reads and writes through.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod model;
pub mod schema;

pub use error::{Error, Result};
pub use model::{EmbeddingStatus, Location, Part, PartId};
pub use schema::Database;
