use anyhow::{Context, Result};
use partdb_embed::Config;

use super::open_database;

pub fn run_add(config: &Config, location: &str, description: Option<&str>) -> Result<()> {
    let db = open_database(config)?;

    let created = db
        .insert_location(location)
        .with_context(|| format!("Failed to add location '{}'", location))?;
    if created {
        println!("✓ Added location {}", location);
    } else {
        log::info!("Location '{}' already exists", location);
    }

    if let Some(description) = description {
        let part = db
            .insert_part(location, description)
            .with_context(|| format!("Failed to add part to '{}'", location))?;
        println!(
            "✓ Added part {} to {}: {}",
            part.id, part.location, part.description
        );
        println!("  Run 'partdb update-embeddings' to make it findable by semantic search");
    }

    Ok(())
}
