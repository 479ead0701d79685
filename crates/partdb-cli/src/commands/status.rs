use anyhow::Result;
use partdb_embed::Config;

use super::open_database;

pub fn show_status(config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let stats = db.embedding_stats()?;

    println!("\n📦 partdb Status\n");
    println!("  Database: {}", config.database_path.display());
    println!("  Locations: {}", stats.locations);
    println!("  Parts: {}", stats.parts);
    println!("  Embeddings:");
    println!("    fresh:  {}", stats.fresh);
    println!("    stale:  {}", stats.stale);
    println!("    absent: {}", stats.absent);

    if stats.stale + stats.absent > 0 {
        println!("\n  Run `partdb update-embeddings` to embed the remaining parts");
    }

    Ok(())
}
