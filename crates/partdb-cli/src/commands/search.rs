use anyhow::{Context, Result};
use partdb_embed::{provider, Config};
use partdb_search::{SearchEngine, SearchHit, SearchMode};

use super::open_database;

#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub full_text: bool,
    pub limit: usize,
    pub json: bool,
}

pub async fn run_search(config: &Config, query: &str, options: &SearchOptions) -> Result<()> {
    let db = open_database(config)?;
    let engine = SearchEngine::new(&db);

    let hits = if options.full_text {
        engine.search_lexical(query, options.limit)?
    } else {
        let provider = provider::from_config(config)
            .context("Cannot embed the query (try --full-text)")?;
        engine
            .search(SearchMode::Semantic, provider.as_ref(), query, options.limit)
            .await?
    };

    log::info!("{} hits for '{}'", hits.len(), query);

    if options.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No matching parts");
        return Ok(());
    }

    for hit in &hits {
        println!("{}", format_hit(hit, options.full_text));
    }

    Ok(())
}

fn format_hit(hit: &SearchHit, full_text: bool) -> String {
    let relevance = if full_text {
        format!("score={:.3}", hit.score)
    } else {
        format!("dist={:.3}", hit.distance())
    };
    format!(
        "{}: {} (id={}, {}, empty={},{})",
        hit.part.location,
        hit.part.description,
        hit.part.id,
        relevance,
        hit.neighbours.previous.as_deref().unwrap_or("-"),
        hit.neighbours.next.as_deref().unwrap_or("-"),
    )
}
