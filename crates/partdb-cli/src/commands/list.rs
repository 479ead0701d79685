use anyhow::Result;
use partdb_embed::Config;

use super::open_database;

pub fn run_list(config: &Config, locations: bool, location: Option<&str>) -> Result<()> {
    let db = open_database(config)?;

    if locations {
        for location in db.list_locations()? {
            println!("{}", location.name);
        }
        return Ok(());
    }

    if let Some(location) = location {
        if !db.location_exists(location)? {
            anyhow::bail!("Unknown location '{}'", location);
        }
    }

    let parts = db.list_parts(location)?;
    if parts.is_empty() {
        println!("No parts");
        return Ok(());
    }

    for part in parts {
        println!(
            "{}: {} (id={}, embedding={})",
            part.location,
            part.description,
            part.id,
            part.embedding_status.as_str()
        );
    }

    Ok(())
}
