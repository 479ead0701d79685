use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::model::{
    EmbeddedPart, EmbeddingStatus, EmbeddingUpdate, EmptyNeighbours, Location, Part, PartId,
    PendingEmbedding,
};

use super::migrations::MIGRATIONS;
use super::vector::{blob_to_embedding, embedding_to_blob};

/// Columns read by [`row_to_part`], in order. Queries alias `parts` as `p`.
const PART_COLUMNS: &str = "p.id, p.location, p.description, p.embedding IS NOT NULL, \
     p.embedded_description, p.embedded_at, p.created_at, p.updated_at";

/// Predicate selecting parts whose embedding is absent or stale.
const NEEDS_EMBEDDING: &str = "embedding IS NULL \
     OR embedded_description IS NULL \
     OR embedded_description <> description";

/// A database connection with CRUD methods for parts and locations.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

/// Counts of locations, parts, and per-status embeddings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbeddingStats {
    pub locations: usize,
    pub parts: usize,
    pub fresh: usize,
    pub stale: usize,
    pub absent: usize,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        // Foreign keys are off by default in SQLite and the setting is per connection.
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                let tx = self.conn.unchecked_transaction()?;
                tx.execute_batch(migration.sql)?;
                tx.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    params![migration.version, migration.name],
                )?;
                tx.commit()?;
            }
        }

        Ok(())
    }
}

// Location CRUD
impl Database {
    /// Insert a location. Returns `false` if it already existed.
    ///
    /// Names are trimmed; every method taking a location name trims it the
    /// same way before lookup.
    pub fn insert_location(&self, name: &str) -> Result<bool> {
        let name = validate_location_name(name)?;
        let inserted = self.conn.execute(
            "INSERT INTO locations (name) VALUES (?1) ON CONFLICT DO NOTHING",
            [name],
        )?;
        if inserted > 0 {
            log::debug!("Created location '{}'", name);
        }
        Ok(inserted > 0)
    }

    /// Check whether a location exists.
    pub fn location_exists(&self, name: &str) -> Result<bool> {
        let name = name.trim();
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM locations WHERE name = ?1)",
            [name],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// List all locations ordered by name.
    pub fn list_locations(&self) -> Result<Vec<Location>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM locations ORDER BY name")?;
        let locations = stmt
            .query_map([], |row| Ok(Location::new(row.get::<_, String>(0)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(locations)
    }

    /// Delete a location that no part references.
    ///
    /// Fails with [`Error::ReferentialIntegrity`] if any part is still stored
    /// there; nothing is changed in that case.
    pub fn delete_location(&self, name: &str) -> Result<()> {
        let name = name.trim();
        let tx = self.conn.unchecked_transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM locations WHERE name = ?1)",
            [name],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(Error::location_not_found(name));
        }

        let parts: i64 = tx.query_row(
            "SELECT COUNT(*) FROM parts WHERE location = ?1",
            [name],
            |row| row.get(0),
        )?;
        if parts > 0 {
            return Err(Error::ReferentialIntegrity {
                location: name.to_string(),
                parts: to_count(parts),
            });
        }

        tx.execute("DELETE FROM locations WHERE name = ?1", [name])?;
        tx.commit()?;
        log::debug!("Deleted location '{}'", name);
        Ok(())
    }

    /// Find the nearest locations, by name order on either side of
    /// `location`, that hold no parts.
    pub fn empty_neighbours(&self, location: &str) -> Result<EmptyNeighbours> {
        let location = location.trim();
        let previous = self
            .conn
            .query_row(
                "SELECT name FROM locations l
                 WHERE name < ?1
                 AND NOT EXISTS (SELECT 1 FROM parts WHERE location = l.name)
                 ORDER BY name DESC
                 LIMIT 1",
                [location],
                |row| row.get(0),
            )
            .optional()?;

        let next = self
            .conn
            .query_row(
                "SELECT name FROM locations l
                 WHERE name > ?1
                 AND NOT EXISTS (SELECT 1 FROM parts WHERE location = l.name)
                 ORDER BY name
                 LIMIT 1",
                [location],
                |row| row.get(0),
            )
            .optional()?;

        Ok(EmptyNeighbours { previous, next })
    }
}

// Part CRUD
impl Database {
    /// Insert a new part at an existing location.
    ///
    /// The part starts without an embedding; run the synchronizer to add one.
    pub fn insert_part(&self, location: &str, description: &str) -> Result<Part> {
        let description = validate_description(description)?;
        let location = location.trim();
        if !self.location_exists(location)? {
            return Err(Error::location_not_found(location));
        }

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO parts (location, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![location, description, now],
        )?;
        let id = PartId::new(self.conn.last_insert_rowid());
        log::debug!("Inserted part {} at '{}'", id, location);

        self.get_part(id)?.ok_or_else(|| Error::part_not_found(id))
    }

    /// Get a part by id.
    pub fn get_part(&self, id: PartId) -> Result<Option<Part>> {
        let part = self
            .conn
            .query_row(
                &format!("SELECT {PART_COLUMNS} FROM parts p WHERE p.id = ?1"),
                [id],
                row_to_part,
            )
            .optional()?;
        Ok(part)
    }

    /// List parts, optionally restricted to one location.
    ///
    /// Ordered by location then description, or by description alone when a
    /// location is given.
    pub fn list_parts(&self, location: Option<&str>) -> Result<Vec<Part>> {
        let parts = if let Some(location) = location.map(str::trim) {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {PART_COLUMNS} FROM parts p
                 WHERE p.location = ?1
                 ORDER BY p.description, p.id"
            ))?;
            let rows = stmt
                .query_map([location], row_to_part)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        } else {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {PART_COLUMNS} FROM parts p
                 ORDER BY p.location, p.description, p.id"
            ))?;
            let rows = stmt
                .query_map([], row_to_part)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        Ok(parts)
    }

    /// Move a part to another existing location.
    ///
    /// Moving does not touch the description, so the embedding stays as is.
    pub fn move_part(&self, id: PartId, location: &str) -> Result<Part> {
        let location = location.trim();
        let tx = self.conn.unchecked_transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM locations WHERE name = ?1)",
            [location],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(Error::location_not_found(location));
        }

        let changed = tx.execute(
            "UPDATE parts SET location = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, location, Utc::now().to_rfc3339()],
        )?;
        if changed == 0 {
            return Err(Error::part_not_found(id));
        }
        tx.commit()?;

        self.get_part(id)?.ok_or_else(|| Error::part_not_found(id))
    }

    /// Delete a part.
    pub fn delete_part(&self, id: PartId) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM parts WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(Error::part_not_found(id));
        }
        log::debug!("Deleted part {}", id);
        Ok(())
    }

    /// Replace a part's description.
    ///
    /// In the same transaction the FTS5 trigger re-indexes the new text and
    /// the embedding source marker is cleared, so the part reads as stale
    /// until the next synchronization. Any existing vector is kept.
    pub fn update_description(&self, id: PartId, description: &str) -> Result<Part> {
        let description = validate_description(description)?;
        let tx = self.conn.unchecked_transaction()?;

        let changed = tx.execute(
            "UPDATE parts
             SET description = ?2, embedded_description = NULL, updated_at = ?3
             WHERE id = ?1",
            params![id, description, Utc::now().to_rfc3339()],
        )?;
        if changed == 0 {
            return Err(Error::part_not_found(id));
        }
        tx.commit()?;
        log::debug!("Updated description of part {}; embedding now stale", id);

        self.get_part(id)?.ok_or_else(|| Error::part_not_found(id))
    }
}

// Embedding synchronization
impl Database {
    /// List every part whose embedding is absent or stale, ordered by id.
    pub fn list_unsynced_parts(&self) -> Result<Vec<PendingEmbedding>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, description FROM parts WHERE {NEEDS_EMBEDDING} ORDER BY id"
        ))?;
        let pending = stmt
            .query_map([], |row| {
                Ok(PendingEmbedding {
                    id: row.get(0)?,
                    description: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pending)
    }

    /// Write a batch of embeddings in one transaction.
    ///
    /// Each vector lands only if the part still has the description it was
    /// computed from; parts edited in the meantime stay stale. Returns the
    /// number of parts written.
    pub fn store_embeddings(&self, updates: &[EmbeddingUpdate]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE parts
                 SET embedding = ?2, embedded_description = ?3, embedded_at = ?4
                 WHERE id = ?1 AND description = ?3",
            )?;
            for update in updates {
                written += stmt.execute(params![
                    update.id,
                    embedding_to_blob(&update.embedding),
                    update.source_description,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    /// Count locations, parts, and embeddings by status.
    pub fn embedding_stats(&self) -> Result<EmbeddingStats> {
        let locations: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))?;

        let (parts, absent, fresh): (i64, i64, i64) = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN embedding IS NULL THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN embedding IS NOT NULL
                                       AND embedded_description = description
                                      THEN 1 ELSE 0 END), 0)
             FROM parts",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let parts = to_count(parts);
        let absent = to_count(absent);
        let fresh = to_count(fresh);
        Ok(EmbeddingStats {
            locations: to_count(locations),
            parts,
            fresh,
            stale: parts.saturating_sub(absent + fresh),
            absent,
        })
    }
}

// Retrieval primitives
impl Database {
    /// Run an FTS5 match expression against part descriptions.
    ///
    /// Returns parts with a relevance score (negated BM25, higher is better),
    /// most relevant first, ties by ascending id.
    pub fn search_fts(&self, match_expr: &str, limit: usize) -> Result<Vec<(Part, f64)>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PART_COLUMNS}, bm25(parts_fts) AS relevance
             FROM parts_fts
             JOIN parts p ON p.id = parts_fts.rowid
             WHERE parts_fts MATCH ?1
             ORDER BY relevance ASC, p.id ASC
             LIMIT ?2"
        ))?;
        let hits = stmt
            .query_map(params![match_expr, to_limit(limit)], |row| {
                let part = row_to_part(row)?;
                let bm25: f64 = row.get(8)?;
                Ok((part, -bm25))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(hits)
    }

    /// Load every part that has a stored embedding, fresh or stale.
    pub fn list_embedded_parts(&self) -> Result<Vec<EmbeddedPart>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PART_COLUMNS}, p.embedding FROM parts p
             WHERE p.embedding IS NOT NULL
             ORDER BY p.id"
        ))?;
        let parts = stmt
            .query_map([], |row| {
                let part = row_to_part(row)?;
                let blob: Vec<u8> = row.get(8)?;
                let embedding = blob_to_embedding(&blob).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        8,
                        Type::Blob,
                        Box::new(Error::InvalidData(format!(
                            "embedding of part {} has {} bytes, not a multiple of 4",
                            part.id,
                            blob.len()
                        ))),
                    )
                })?;
                Ok(EmbeddedPart { part, embedding })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(parts)
    }
}

fn row_to_part(row: &Row<'_>) -> rusqlite::Result<Part> {
    let description: String = row.get(2)?;
    let has_embedding: bool = row.get(3)?;
    let embedded_description: Option<String> = row.get(4)?;
    let embedded_at: Option<String> = row.get(5)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    Ok(Part {
        id: row.get(0)?,
        location: row.get(1)?,
        embedding_status: EmbeddingStatus::from_columns(
            has_embedding,
            embedded_description.as_deref(),
            &description,
        ),
        description,
        embedded_at: embedded_at
            .as_deref()
            .map(|s| parse_timestamp(5, s))
            .transpose()?,
        created_at: parse_timestamp(6, &created_at)?,
        updated_at: parse_timestamp(7, &updated_at)?,
    })
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn validate_description(description: &str) -> Result<&str> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidData(
            "part description must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

fn validate_location_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidData(
            "location name must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

fn to_count(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

fn to_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
