//! The search engine.

use std::cmp::Ordering;
use std::collections::HashMap;

use partdb_core::model::EmptyNeighbours;
use partdb_core::{Database, Part};
use partdb_embed::{EmbeddingProvider, ProviderError};
use serde::Serialize;

use crate::error::{SearchError, SearchResult};
use crate::metric::cosine_similarity;
use crate::query::match_expression;

/// Retrieval mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Full-text match on description tokens, ranked by BM25.
    Lexical,
    /// Cosine similarity between the query embedding and stored embeddings.
    #[default]
    Semantic,
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub part: Part,
    /// Relevance, higher is better. Cosine similarity for semantic search,
    /// negated BM25 for lexical search.
    pub score: f64,
    /// Nearest empty locations around the part's location.
    pub neighbours: EmptyNeighbours,
}

impl SearchHit {
    /// Cosine distance (`1 - score`); only meaningful for semantic hits.
    pub fn distance(&self) -> f64 {
        1.0 - self.score
    }
}

/// Runs lexical and semantic queries against a store.
#[derive(Debug, Clone, Copy)]
pub struct SearchEngine<'a> {
    db: &'a Database,
}

impl<'a> SearchEngine<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Search in the given mode. `provider` is only used for semantic search.
    pub async fn search(
        &self,
        mode: SearchMode,
        provider: &dyn EmbeddingProvider,
        query: &str,
        limit: usize,
    ) -> SearchResult<Vec<SearchHit>> {
        match mode {
            SearchMode::Lexical => self.search_lexical(query, limit),
            SearchMode::Semantic => self.search_semantic(provider, query, limit).await,
        }
    }

    /// Lexical search over the full-text index.
    ///
    /// Any query term matching counts as a hit. A query without terms
    /// returns nothing.
    pub fn search_lexical(&self, query: &str, limit: usize) -> SearchResult<Vec<SearchHit>> {
        let Some(expr) = match_expression(query) else {
            return Ok(Vec::new());
        };
        if limit == 0 {
            return Ok(Vec::new());
        }

        log::debug!("Lexical search: {}", expr);
        let ranked = self.db.search_fts(&expr, limit)?;
        self.with_neighbours(ranked)
    }

    /// Semantic search over stored embeddings, stale ones included.
    ///
    /// Parts without an embedding are not candidates. Parts whose vector
    /// length differs from the query's are skipped.
    pub async fn search_semantic(
        &self,
        provider: &dyn EmbeddingProvider,
        query: &str,
        limit: usize,
    ) -> SearchResult<Vec<SearchHit>> {
        if query.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let query_vector = provider
            .embed(query)
            .await
            .map_err(SearchError::EmbeddingUnavailable)?;
        if query_vector.len() != provider.dimensions() {
            return Err(SearchError::EmbeddingUnavailable(
                ProviderError::DimensionMismatch {
                    provider: provider.name().to_string(),
                    expected: provider.dimensions(),
                    actual: query_vector.len(),
                },
            ));
        }

        let candidates = self.db.list_embedded_parts()?;
        let mut skipped = 0usize;
        let mut ranked: Vec<(Part, f64)> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match cosine_similarity(&query_vector, &candidate.embedding) {
                Some(score) => ranked.push((candidate.part, score)),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            log::warn!(
                "Skipped {} parts whose embeddings are not {}-dimensional; run update-embeddings after changing models",
                skipped,
                query_vector.len()
            );
        }

        ranked.sort_by(|(a, score_a), (b, score_b)| {
            score_b
                .partial_cmp(score_a)
                .unwrap_or(Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        ranked.truncate(limit);

        self.with_neighbours(ranked)
    }

    fn with_neighbours(&self, ranked: Vec<(Part, f64)>) -> SearchResult<Vec<SearchHit>> {
        let mut cache: HashMap<String, EmptyNeighbours> = HashMap::new();
        let mut hits = Vec::with_capacity(ranked.len());
        for (part, score) in ranked {
            let neighbours = match cache.get(&part.location) {
                Some(found) => found.clone(),
                None => {
                    let found = self.db.empty_neighbours(&part.location)?;
                    cache.insert(part.location.clone(), found.clone());
                    found
                }
            };
            hits.push(SearchHit {
                part,
                score,
                neighbours,
            });
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partdb_embed::LocalProvider;

    fn store() -> Database {
        let db = Database::open_in_memory().unwrap();
        for location in ["a1", "a2", "a3", "a4"] {
            db.insert_location(location).unwrap();
        }
        db.insert_part("a2", "red resistor 220ohm").unwrap();
        db.insert_part("a2", "blue capacitor 10uF").unwrap();
        db.insert_part("a4", "resistor network").unwrap();
        db
    }

    #[test]
    fn test_lexical_finds_matching_parts() {
        let db = store();
        let hits = SearchEngine::new(&db).search_lexical("resistor", 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits
            .iter()
            .all(|h| h.part.description.contains("resistor")));
    }

    #[test]
    fn test_lexical_no_terms_or_zero_limit() {
        let db = store();
        let engine = SearchEngine::new(&db);
        assert!(engine.search_lexical("   ", 10).unwrap().is_empty());
        assert!(engine.search_lexical("resistor", 0).unwrap().is_empty());
    }

    #[test]
    fn test_hits_carry_empty_neighbours() {
        let db = store();
        let hits = SearchEngine::new(&db).search_lexical("capacitor", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].neighbours.previous.as_deref(), Some("a1"));
        assert_eq!(hits[0].neighbours.next.as_deref(), Some("a3"));
    }

    #[tokio::test]
    async fn test_semantic_without_embeddings_is_empty() {
        let db = store();
        let provider = LocalProvider::new();
        let hits = SearchEngine::new(&db)
            .search_semantic(&provider, "resistor", 10)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_distance_is_one_minus_score() {
        let db = store();
        let part = db.get_part(partdb_core::PartId::new(1)).unwrap().unwrap();
        let hit = SearchHit {
            part,
            score: 0.75,
            neighbours: EmptyNeighbours::default(),
        };
        assert!((hit.distance() - 0.25).abs() < 1e-12);
    }
}
