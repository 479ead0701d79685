//! Integration tests for lexical and semantic search.

use std::collections::HashMap;

use async_trait::async_trait;
use partdb_core::model::EmbeddingUpdate;
use partdb_core::{Database, EmbeddingStatus, PartId};
use partdb_embed::{EmbeddingProvider, LocalProvider, ProviderError, ProviderResult, Synchronizer};
use partdb_search::{SearchEngine, SearchError, SearchMode};
use tempfile::TempDir;

/// Embeds known texts to fixed vectors; anything else is an error.
#[derive(Debug)]
struct TableProvider {
    table: HashMap<String, Vec<f32>>,
}

impl TableProvider {
    fn new(entries: &[(&str, [f32; 3])]) -> Self {
        Self {
            table: entries
                .iter()
                .map(|(text, v)| ((*text).to_string(), v.to_vec()))
                .collect(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for TableProvider {
    fn name(&self) -> &str {
        "table"
    }

    fn dimensions(&self) -> usize {
        3
    }

    async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>> {
        self.table
            .get(text)
            .cloned()
            .ok_or_else(|| ProviderError::Http {
                provider: "table".to_string(),
                status: 404,
                message: format!("no vector for '{text}'"),
            })
    }
}

/// Always fails, as an unreachable service would.
#[derive(Debug)]
struct Offline;

#[async_trait]
impl EmbeddingProvider for Offline {
    fn name(&self) -> &str {
        "offline"
    }

    fn dimensions(&self) -> usize {
        3
    }

    async fn embed(&self, _text: &str) -> ProviderResult<Vec<f32>> {
        Err(ProviderError::RateLimited {
            provider: "offline".to_string(),
        })
    }
}

fn ids(hits: &[partdb_search::SearchHit]) -> Vec<PartId> {
    hits.iter().map(|h| h.part.id).collect()
}

#[test]
fn test_description_write_updates_lexical_index() {
    let db = Database::open_in_memory().unwrap();
    db.insert_location("bin1").unwrap();
    let part = db.insert_part("bin1", "red resistor 220ohm").unwrap();
    let engine = SearchEngine::new(&db);

    assert_eq!(ids(&engine.search_lexical("resistor", 10).unwrap()), vec![part.id]);

    db.update_description(part.id, "blue capacitor 10uF").unwrap();

    assert!(engine.search_lexical("resistor", 10).unwrap().is_empty());
    assert!(engine.search_lexical("red", 10).unwrap().is_empty());
    let hits = engine.search_lexical("capacitor", 10).unwrap();
    assert_eq!(ids(&hits), vec![part.id]);
    assert_eq!(hits[0].part.location, "bin1");
    assert_eq!(hits[0].part.embedding_status, EmbeddingStatus::Absent);
}

#[test]
fn test_lexical_matching_is_case_insensitive_and_stemmed() {
    let db = Database::open_in_memory().unwrap();
    db.insert_location("bin1").unwrap();
    let part = db.insert_part("bin1", "Ceramic Capacitors assorted").unwrap();
    let engine = SearchEngine::new(&db);

    assert_eq!(ids(&engine.search_lexical("capacitor", 10).unwrap()), vec![part.id]);
    assert_eq!(ids(&engine.search_lexical("CERAMIC", 10).unwrap()), vec![part.id]);
}

#[test]
fn test_lexical_without_matches_is_empty() {
    let db = Database::open_in_memory().unwrap();
    db.insert_location("bin1").unwrap();
    db.insert_part("bin1", "m3 hex bolt").unwrap();

    let hits = SearchEngine::new(&db).search_lexical("resistor", 10).unwrap();
    assert!(hits.is_empty());
}

#[test]
fn test_lexical_ranks_parts_matching_more_terms_first() {
    let db = Database::open_in_memory().unwrap();
    db.insert_location("bin1").unwrap();
    let one_term = db.insert_part("bin1", "red resistor").unwrap();
    let two_terms = db.insert_part("bin1", "blue capacitor resistor").unwrap();

    let hits = SearchEngine::new(&db)
        .search_lexical("capacitor resistor", 10)
        .unwrap();

    assert_eq!(ids(&hits), vec![two_terms.id, one_term.id]);
    assert!(hits[0].score > hits[1].score);
}

#[test]
fn test_lexical_ties_break_by_id() {
    let db = Database::open_in_memory().unwrap();
    db.insert_location("bin1").unwrap();
    let first = db.insert_part("bin1", "green led 5mm").unwrap();
    let second = db.insert_part("bin1", "green led 5mm").unwrap();

    let hits = SearchEngine::new(&db).search_lexical("led", 10).unwrap();
    assert_eq!(ids(&hits), vec![first.id, second.id]);

    let limited = SearchEngine::new(&db).search_lexical("led", 1).unwrap();
    assert_eq!(ids(&limited), vec![first.id]);
}

#[tokio::test]
async fn test_identical_embedding_ranks_above_dissimilar() {
    let db = Database::open_in_memory().unwrap();
    db.insert_location("bin1").unwrap();
    let near = db.insert_part("bin1", "near").unwrap();
    let far = db.insert_part("bin1", "far").unwrap();
    let provider = TableProvider::new(&[
        ("near", [1.0, 0.0, 0.0]),
        ("far", [0.0, 1.0, 0.0]),
        ("query", [1.0, 0.0, 0.0]),
    ]);
    Synchronizer::new(&db, &provider).sync_all().await.unwrap();

    let hits = SearchEngine::new(&db)
        .search_semantic(&provider, "query", 10)
        .await
        .unwrap();

    assert_eq!(ids(&hits), vec![near.id, far.id]);
    assert!(hits[0].score > hits[1].score);
    assert!(hits[0].distance().abs() < 1e-9);
}

#[tokio::test]
async fn test_semantic_ties_break_by_id() {
    let db = Database::open_in_memory().unwrap();
    db.insert_location("bin1").unwrap();
    let a = db.insert_part("bin1", "twin").unwrap();
    let b = db.insert_part("bin1", "twin").unwrap();
    let provider = TableProvider::new(&[("twin", [0.0, 0.0, 1.0]), ("q", [0.0, 0.0, 1.0])]);
    Synchronizer::new(&db, &provider).sync_all().await.unwrap();

    let hits = SearchEngine::new(&db)
        .search_semantic(&provider, "q", 10)
        .await
        .unwrap();
    assert_eq!(ids(&hits), vec![a.id, b.id]);
}

#[tokio::test]
async fn test_resync_ranks_by_current_descriptions() {
    let db = Database::open_in_memory().unwrap();
    db.insert_location("bin1").unwrap();
    let edited = db.insert_part("bin1", "red resistor 220ohm").unwrap();
    let untouched = db.insert_part("bin1", "m3 hex bolt").unwrap();
    let provider = TableProvider::new(&[
        ("red resistor 220ohm", [1.0, 0.0, 0.0]),
        ("blue capacitor 10uF", [0.0, 1.0, 0.0]),
        ("m3 hex bolt", [0.0, 0.0, 1.0]),
        ("capacitor", [0.0, 0.9, 0.1]),
    ]);
    Synchronizer::new(&db, &provider).sync_all().await.unwrap();

    db.update_description(edited.id, "blue capacitor 10uF").unwrap();
    assert_eq!(
        db.get_part(edited.id).unwrap().unwrap().embedding_status,
        EmbeddingStatus::Stale
    );

    // Before the sync the stale vector still answers for the old text.
    let engine = SearchEngine::new(&db);
    let before = engine.search_semantic(&provider, "capacitor", 10).await.unwrap();
    assert_eq!(ids(&before), vec![untouched.id, edited.id]);

    let report = Synchronizer::new(&db, &provider).sync_all().await.unwrap();
    assert_eq!(report.synced, 1);

    let after = engine.search_semantic(&provider, "capacitor", 10).await.unwrap();
    assert_eq!(ids(&after), vec![edited.id, untouched.id]);
    assert!(after
        .iter()
        .all(|h| h.part.embedding_status == EmbeddingStatus::Fresh));
}

#[tokio::test]
async fn test_query_embedding_failure_is_reported() {
    let db = Database::open_in_memory().unwrap();
    db.insert_location("bin1").unwrap();
    db.insert_part("bin1", "red resistor").unwrap();

    let err = SearchEngine::new(&db)
        .search_semantic(&Offline, "resistor", 10)
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::EmbeddingUnavailable(_)));
    assert!(err.to_string().contains("--full-text"));

    // Lexical search is unaffected by the provider being down.
    let hits = SearchEngine::new(&db)
        .search(SearchMode::Lexical, &Offline, "resistor", 10)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn test_mismatched_vectors_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open(temp_dir.path().join("parts.db")).unwrap();
    db.insert_location("bin1").unwrap();
    let current = db.insert_part("bin1", "led").unwrap();
    let legacy = db.insert_part("bin1", "old model").unwrap();
    db.store_embeddings(&[
        EmbeddingUpdate {
            id: current.id,
            source_description: "led".to_string(),
            embedding: vec![1.0, 0.0, 0.0],
        },
        EmbeddingUpdate {
            id: legacy.id,
            source_description: "old model".to_string(),
            embedding: vec![1.0, 0.0],
        },
    ])
    .unwrap();

    let provider = TableProvider::new(&[("led", [1.0, 0.0, 0.0])]);
    let hits = SearchEngine::new(&db)
        .search_semantic(&provider, "led", 10)
        .await
        .unwrap();
    assert_eq!(ids(&hits), vec![current.id]);
}

#[tokio::test]
async fn test_local_provider_end_to_end() {
    let db = Database::open_in_memory().unwrap();
    for location in ["a1", "a2", "a3"] {
        db.insert_location(location).unwrap();
    }
    let resistor = db.insert_part("a2", "red resistor 220ohm").unwrap();
    db.insert_part("a2", "steel hex bolt m3").unwrap();
    let provider = LocalProvider::new();
    Synchronizer::new(&db, &provider).sync_all().await.unwrap();

    let hits = SearchEngine::new(&db)
        .search(SearchMode::Semantic, &provider, "red resistor 220ohm", 1)
        .await
        .unwrap();
    assert_eq!(ids(&hits), vec![resistor.id]);
    assert_eq!(hits[0].neighbours.previous.as_deref(), Some("a1"));
    assert_eq!(hits[0].neighbours.next.as_deref(), Some("a3"));
}
