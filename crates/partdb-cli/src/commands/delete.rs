use anyhow::{Context, Result};
use partdb_core::PartId;
use partdb_embed::Config;

use super::open_database;

/// Delete exactly one of a location or a part.
pub fn run_delete(config: &Config, location: Option<&str>, id: Option<PartId>) -> Result<()> {
    let db = open_database(config)?;

    match (location, id) {
        (Some(location), None) => {
            db.delete_location(location)
                .with_context(|| format!("Cannot delete location '{}'", location))?;
            println!("✓ Deleted location {}", location);
        }
        (None, Some(id)) => {
            db.delete_part(id)
                .with_context(|| format!("Cannot delete part {}", id))?;
            println!("✓ Deleted part {}", id);
        }
        _ => anyhow::bail!("Specify exactly one of --location or --id"),
    }

    Ok(())
}
