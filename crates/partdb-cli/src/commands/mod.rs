pub mod add;
pub mod config;
pub mod delete;
pub mod embeddings;
pub mod init;
pub mod list;
pub mod search;
pub mod status;
pub mod update;

use anyhow::{Context, Result};
use partdb_core::Database;
use partdb_embed::Config;

/// Open the configured database, applying any pending migrations.
pub fn open_database(config: &Config) -> Result<Database> {
    Database::open(&config.database_path).with_context(|| {
        format!(
            "Failed to open database at {}",
            config.database_path.display()
        )
    })
}
