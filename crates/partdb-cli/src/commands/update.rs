use anyhow::{Context, Result};
use partdb_core::PartId;
use partdb_embed::Config;

use super::open_database;

pub fn run_move(config: &Config, id: PartId, location: &str) -> Result<()> {
    let db = open_database(config)?;
    let part = db
        .move_part(id, location)
        .with_context(|| format!("Cannot move part {} to '{}'", id, location))?;
    println!("✓ Moved part {} to {}", part.id, part.location);
    Ok(())
}

/// Replace a description. The embedding is left stale for the next sync.
pub fn run_update(config: &Config, id: PartId, description: &str) -> Result<()> {
    let db = open_database(config)?;
    let part = db
        .update_description(id, description)
        .with_context(|| format!("Cannot update part {}", id))?;
    println!("✓ Updated part {}: {}", part.id, part.description);
    if part.embedding_status.needs_sync() {
        println!("  Embedding is {}; run 'partdb update-embeddings'", part.embedding_status.as_str());
    }
    Ok(())
}
