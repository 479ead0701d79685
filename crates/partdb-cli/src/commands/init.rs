use anyhow::Result;
use partdb_embed::Config;

use super::open_database;

pub fn run_init(config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let stats = db.embedding_stats()?;

    println!("✓ Database ready: {}", config.database_path.display());
    println!(
        "  {} locations, {} parts",
        stats.locations, stats.parts
    );

    Ok(())
}
