/// A schema migration.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATION_001: &str = r#"
-- Locations: a name is the whole identity
CREATE TABLE IF NOT EXISTS locations (
    name TEXT PRIMARY KEY NOT NULL
);

-- Parts
--
-- embedded_description holds the exact text the stored embedding was
-- computed from. It is cleared on every description write, which is what
-- marks an embedding stale.
CREATE TABLE IF NOT EXISTS parts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    location TEXT NOT NULL REFERENCES locations(name),
    description TEXT NOT NULL,
    embedding BLOB,
    embedded_description TEXT,
    embedded_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_parts_location ON parts(location);

-- Lexical index over parts.description
CREATE VIRTUAL TABLE IF NOT EXISTS parts_fts USING fts5(
    description,
    content = 'parts',
    content_rowid = 'id',
    tokenize = 'porter unicode61'
);

-- Keep parts_fts in the same transaction as every write to parts
CREATE TRIGGER IF NOT EXISTS parts_fts_insert AFTER INSERT ON parts BEGIN
    INSERT INTO parts_fts (rowid, description) VALUES (new.id, new.description);
END;

CREATE TRIGGER IF NOT EXISTS parts_fts_delete AFTER DELETE ON parts BEGIN
    INSERT INTO parts_fts (parts_fts, rowid, description)
    VALUES ('delete', old.id, old.description);
END;

CREATE TRIGGER IF NOT EXISTS parts_fts_update AFTER UPDATE OF description ON parts BEGIN
    INSERT INTO parts_fts (parts_fts, rowid, description)
    VALUES ('delete', old.id, old.description);
    INSERT INTO parts_fts (rowid, description) VALUES (new.id, new.description);
END;
"#;

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: MIGRATION_001,
}];
