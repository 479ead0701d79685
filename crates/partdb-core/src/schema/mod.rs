pub mod db;
pub mod migrations;
pub mod vector;

pub use db::{Database, EmbeddingStats};
