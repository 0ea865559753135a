//! SQLite schema definitions and versioned migrations.

use rusqlite::Connection;

/// Migrations applied in order; position i holds the DDL for version i + 1.
/// Each migration runs in its own transaction and records its version, so
/// startup is deterministic regardless of which version a database is at.
const MIGRATIONS: &[&str] = &[SCHEMA_V1];

/// Current schema version.
pub const SCHEMA_VERSION: i64 = MIGRATIONS.len() as i64;

/// Version 1: full initial schema.
const SCHEMA_V1: &str = r#"
-- Per-word statistics; the normalized word text is the key
CREATE TABLE IF NOT EXISTS word_stats (
    word TEXT PRIMARY KEY,
    correct_count INTEGER NOT NULL DEFAULT 0,
    incorrect_count INTEGER NOT NULL DEFAULT 0,
    total_appearances INTEGER NOT NULL DEFAULT 0,
    difficulty_score REAL NOT NULL DEFAULT 1.0,
    consecutive_correct INTEGER NOT NULL DEFAULT 0,
    last_seen TEXT,
    last_correct_date TEXT,
    daily_practice_count INTEGER NOT NULL DEFAULT 0,
    practice_date TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

-- Pairwise spelling similarity, stored in both directions so neighbor
-- lookups for either endpoint are single indexed reads
CREATE TABLE IF NOT EXISTS word_similarity (
    word1 TEXT NOT NULL,
    word2 TEXT NOT NULL,
    similarity_score REAL NOT NULL,
    PRIMARY KEY (word1, word2)
);

-- One dense vector per word, owned by the external embedding collaborator
CREATE TABLE IF NOT EXISTS word_embeddings (
    word TEXT PRIMARY KEY,
    embedding BLOB NOT NULL
);

-- Auxiliary generated content; disjoint from stats and similarity
CREATE TABLE IF NOT EXISTS word_content (
    word TEXT PRIMARY KEY,
    definition TEXT,
    example_sentence TEXT,
    generated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_word_stats_difficulty
    ON word_stats(difficulty_score DESC, total_appearances ASC);
CREATE INDEX IF NOT EXISTS idx_word_similarity_lookup
    ON word_similarity(word1, similarity_score DESC);
"#;

/// Bring a database up to [`SCHEMA_VERSION`].
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
        [],
    )?;

    let current: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    for (index, ddl) in MIGRATIONS.iter().enumerate() {
        let version = index as i64 + 1;
        if version <= current {
            continue;
        }

        tracing::info!(version, "applying schema migration");
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(ddl)?;
        tx.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
        tx.commit()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_reach_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, SCHEMA_VERSION);
    }
}
