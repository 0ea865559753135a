//! Repository pattern for database access.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use spelldrill_core::embedding::{
    blob_to_vector, cosine_similarity, vector_to_blob, EmbeddingProvider,
};
use spelldrill_core::metric::similarity;
use spelldrill_core::types::{normalize_word, WordRecord};

use crate::db::date_utils::{format_date, format_timestamp, parse_date, parse_timestamp, today};
use crate::db::error::DbError;
use crate::db::schema;

type Result<T> = std::result::Result<T, DbError>;

/// Observer for long-running similarity computations:
/// `(current, total, context)`. Absence never changes computed results.
/// The reference and trait-object lifetimes are separate so a caller can
/// reborrow the same sink across repeated repository calls.
pub type ProgressFn<'a, 'b> = &'a mut (dyn FnMut(usize, usize, &str) + 'b);

/// Auxiliary generated content for one word (definition, example sentence).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WordContent {
    pub word: String,
    pub definition: Option<String>,
    pub example_sentence: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// Repository for per-word statistics.
pub trait StatsRepository {
    /// Insert-if-absent with defaults; never overwrites existing stats.
    fn ensure_word(&mut self, word: &str) -> Result<()>;

    /// Record one practice attempt and return the updated record.
    ///
    /// `counts_toward_daily_quota` additionally bumps the daily counter in
    /// the same transaction; the batch flow passes `false` and calls
    /// [`StatsRepository::increment_daily_count`] once per fully-correct
    /// batch instead.
    fn record_outcome(
        &mut self,
        word: &str,
        correct: bool,
        counts_toward_daily_quota: bool,
    ) -> Result<WordRecord>;

    /// Count one completed practice toward today's quota.
    fn increment_daily_count(&mut self, word: &str) -> Result<()>;

    fn get_word(&self, word: &str) -> Result<Option<WordRecord>>;

    /// All records, hardest and least-practiced first.
    fn get_all_words(&self) -> Result<Vec<WordRecord>>;

    /// Every stored word key.
    fn word_keys(&self) -> Result<Vec<String>>;

    /// Delete the record plus its similarity edges, embedding, and content,
    /// in one transaction.
    fn remove_word(&mut self, word: &str) -> Result<()>;

    /// Subset of `words` still allowed today. Words absent from the store
    /// are always included: never practiced, so never limited.
    fn filter_by_daily_limit(&self, words: &[String], max_daily: u32) -> Result<Vec<String>>;
}

/// Repository for the symmetric pairwise similarity table.
pub trait SimilarityRepository {
    /// Write both `(a,b)` and `(b,a)`; self-pairs are never stored.
    fn upsert_pair(&mut self, a: &str, b: &str, score: f64) -> Result<()>;

    /// Clear and repopulate all pairs among `words` in one transaction.
    /// Returns the number of unordered pairs written.
    fn rebuild_all(&mut self, words: &[String], progress: Option<ProgressFn>) -> Result<usize>;

    /// Score `new_word` against every other word and upsert both directions.
    /// Returns the number of unordered pairs written.
    fn add_word_similarities(
        &mut self,
        new_word: &str,
        all_words: &[String],
        progress: Option<ProgressFn>,
    ) -> Result<usize>;

    /// Stored neighbors of `word` with score >= `min_similarity`, best
    /// first, at most `limit`. Unknown words yield an empty list.
    fn neighbors(&self, word: &str, min_similarity: f64, limit: usize)
        -> Result<Vec<(String, f64)>>;

    fn score_between(&self, a: &str, b: &str) -> Result<Option<f64>>;

    /// Remove both directions of every edge touching `word`.
    fn remove_edges_for(&mut self, word: &str) -> Result<()>;
}

/// Repository for precomputed semantic vectors.
pub trait EmbeddingRepository {
    fn save_embedding(&mut self, word: &str, vector: &[f32]) -> Result<()>;
    fn load_embedding(&self, word: &str) -> Result<Option<Vec<f32>>>;
    fn embeddings_present(&self) -> Result<bool>;

    /// Subset of `words` with no stored vector, for callers that backfill.
    fn words_without_embeddings(&self, words: &[String]) -> Result<Vec<String>>;

    /// Cosine-similarity neighbors computed on demand against all stored
    /// vectors. Empty when `word` has no vector.
    fn semantic_neighbors(
        &self,
        word: &str,
        min_similarity: f64,
        limit: usize,
    ) -> Result<Vec<(String, f64)>>;
}

/// Repository for auxiliary generated content.
pub trait ContentRepository {
    fn save_content(&mut self, content: &WordContent) -> Result<()>;
    fn get_content(&self, word: &str) -> Result<Option<WordContent>>;
}

/// SQLite implementation of the repositories.
///
/// An explicit handle, passed to each component; mutations run as a
/// transaction per operation so concurrent per-word updates cannot lose
/// writes.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Open database at path, creating and migrating if necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Apply a reconciliation diff in one transaction: removals first
    /// (edges, embedding, content, then stats), then default rows for
    /// additions. Inputs are assumed normalized.
    pub fn apply_word_list_changes(
        &mut self,
        to_add: &[String],
        to_remove: &[String],
    ) -> Result<()> {
        let tx = self.conn.transaction()?;

        for word in to_remove {
            Self::delete_word_rows(&tx, word)?;
        }
        for word in to_add {
            tx.execute(
                "INSERT OR IGNORE INTO word_stats (word) VALUES (?1)",
                params![word],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_word_rows(conn: &Connection, word: &str) -> Result<()> {
        conn.execute(
            "DELETE FROM word_similarity WHERE word1 = ?1 OR word2 = ?1",
            params![word],
        )?;
        conn.execute("DELETE FROM word_embeddings WHERE word = ?1", params![word])?;
        conn.execute("DELETE FROM word_content WHERE word = ?1", params![word])?;
        conn.execute("DELETE FROM word_stats WHERE word = ?1", params![word])?;
        Ok(())
    }

    fn normalized(word: &str) -> Result<String> {
        normalize_word(word).ok_or_else(|| DbError::InvalidWord(word.to_string()))
    }

    fn query_record(conn: &Connection, word: &str) -> Result<Option<WordRecord>> {
        conn.query_row(
            "SELECT word, correct_count, incorrect_count, total_appearances,
                    difficulty_score, consecutive_correct, last_seen,
                    last_correct_date, daily_practice_count, practice_date
             FROM word_stats WHERE word = ?1",
            params![word],
            Self::row_to_record,
        )
        .optional()
        .map_err(Into::into)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<WordRecord> {
        Ok(WordRecord {
            word: row.get(0)?,
            correct_count: row.get(1)?,
            incorrect_count: row.get(2)?,
            total_appearances: row.get(3)?,
            difficulty_score: row.get(4)?,
            consecutive_correct: row.get(5)?,
            last_seen: row
                .get::<_, Option<String>>(6)?
                .and_then(|s| parse_timestamp(&s)),
            last_correct_date: row
                .get::<_, Option<String>>(7)?
                .and_then(|s| parse_date(&s)),
            daily_practice_count: row.get(8)?,
            practice_date: row
                .get::<_, Option<String>>(9)?
                .and_then(|s| parse_date(&s)),
        })
    }

    fn store_record(conn: &Connection, record: &WordRecord) -> Result<()> {
        conn.execute(
            "UPDATE word_stats
             SET correct_count = ?2, incorrect_count = ?3, total_appearances = ?4,
                 difficulty_score = ?5, consecutive_correct = ?6, last_seen = ?7,
                 last_correct_date = ?8, daily_practice_count = ?9, practice_date = ?10
             WHERE word = ?1",
            params![
                record.word,
                record.correct_count,
                record.incorrect_count,
                record.total_appearances,
                record.difficulty_score,
                record.consecutive_correct,
                record.last_seen.map(format_timestamp),
                record.last_correct_date.map(format_date),
                record.daily_practice_count,
                record.practice_date.map(format_date),
            ],
        )?;
        Ok(())
    }

    fn insert_pair(conn: &Connection, a: &str, b: &str, score: f64) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO word_similarity (word1, word2, similarity_score)
             VALUES (?1, ?2, ?3)",
            params![a, b, score],
        )?;
        conn.execute(
            "INSERT OR REPLACE INTO word_similarity (word1, word2, similarity_score)
             VALUES (?1, ?2, ?3)",
            params![b, a, score],
        )?;
        Ok(())
    }

    /// Normalize, dedupe, and sort a caller-supplied word list.
    fn normalize_list(words: &[String]) -> Vec<String> {
        let mut normalized: Vec<String> =
            words.iter().filter_map(|w| normalize_word(w)).collect();
        normalized.sort();
        normalized.dedup();
        normalized
    }
}

impl StatsRepository for SqliteRepository {
    fn ensure_word(&mut self, word: &str) -> Result<()> {
        let word = Self::normalized(word)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO word_stats (word) VALUES (?1)",
            params![word],
        )?;
        Ok(())
    }

    fn record_outcome(
        &mut self,
        word: &str,
        correct: bool,
        counts_toward_daily_quota: bool,
    ) -> Result<WordRecord> {
        let word = Self::normalized(word)?;
        let now = Utc::now();
        let today = today();

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO word_stats (word) VALUES (?1)",
            params![word],
        )?;
        let mut record = Self::query_record(&tx, &word)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))?;

        record.apply_outcome(correct, now, today);
        if counts_toward_daily_quota {
            record.bump_daily_count(today);
        }

        Self::store_record(&tx, &record)?;
        tx.commit()?;
        Ok(record)
    }

    fn increment_daily_count(&mut self, word: &str) -> Result<()> {
        let word = Self::normalized(word)?;
        let today = today();

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO word_stats (word) VALUES (?1)",
            params![word],
        )?;
        let mut record = Self::query_record(&tx, &word)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))?;

        record.bump_daily_count(today);

        Self::store_record(&tx, &record)?;
        tx.commit()?;
        Ok(())
    }

    fn get_word(&self, word: &str) -> Result<Option<WordRecord>> {
        match normalize_word(word) {
            Some(word) => Self::query_record(&self.conn, &word),
            None => Ok(None),
        }
    }

    fn get_all_words(&self) -> Result<Vec<WordRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT word, correct_count, incorrect_count, total_appearances,
                    difficulty_score, consecutive_correct, last_seen,
                    last_correct_date, daily_practice_count, practice_date
             FROM word_stats
             ORDER BY difficulty_score DESC, total_appearances ASC",
        )?;

        let records = stmt
            .query_map([], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn word_keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT word FROM word_stats")?;
        let words = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(words)
    }

    fn remove_word(&mut self, word: &str) -> Result<()> {
        let word = Self::normalized(word)?;
        let tx = self.conn.transaction()?;
        Self::delete_word_rows(&tx, &word)?;
        tx.commit()?;
        Ok(())
    }

    fn filter_by_daily_limit(&self, words: &[String], max_daily: u32) -> Result<Vec<String>> {
        let today = today();
        let mut allowed = Vec::with_capacity(words.len());

        for word in words {
            match self.get_word(word)? {
                Some(record) => {
                    if record.is_under_daily_limit(today, max_daily) {
                        allowed.push(word.clone());
                    }
                }
                None => allowed.push(word.clone()),
            }
        }

        Ok(allowed)
    }
}

impl SimilarityRepository for SqliteRepository {
    fn upsert_pair(&mut self, a: &str, b: &str, score: f64) -> Result<()> {
        let a = Self::normalized(a)?;
        let b = Self::normalized(b)?;
        if a == b {
            // Similarity to self is definitionally 1.0 and never persisted.
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        Self::insert_pair(&tx, &a, &b, score)?;
        tx.commit()?;
        Ok(())
    }

    fn rebuild_all(&mut self, words: &[String], mut progress: Option<ProgressFn>) -> Result<usize> {
        let words = Self::normalize_list(words);
        let total = words.len() * words.len().saturating_sub(1) / 2;

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM word_similarity", [])?;

        let mut current = 0;
        for (i, a) in words.iter().enumerate() {
            for b in words.iter().skip(i + 1) {
                let score = similarity(a, b);
                Self::insert_pair(&tx, a, b, score)?;
                current += 1;
                if let Some(report) = progress.as_deref_mut() {
                    report(current, total, "rebuild");
                }
            }
        }

        tx.commit()?;
        tracing::info!(words = words.len(), pairs = total, "rebuilt similarity matrix");
        Ok(total)
    }

    fn add_word_similarities(
        &mut self,
        new_word: &str,
        all_words: &[String],
        mut progress: Option<ProgressFn>,
    ) -> Result<usize> {
        let new_word = Self::normalized(new_word)?;
        let others: Vec<String> = Self::normalize_list(all_words)
            .into_iter()
            .filter(|w| *w != new_word)
            .collect();
        let total = others.len();

        let tx = self.conn.transaction()?;
        for (current, other) in others.iter().enumerate() {
            let score = similarity(&new_word, other);
            Self::insert_pair(&tx, &new_word, other, score)?;
            if let Some(report) = progress.as_deref_mut() {
                report(current + 1, total, &new_word);
            }
        }
        tx.commit()?;

        Ok(total)
    }

    fn neighbors(
        &self,
        word: &str,
        min_similarity: f64,
        limit: usize,
    ) -> Result<Vec<(String, f64)>> {
        let word = match normalize_word(word) {
            Some(word) => word,
            None => return Ok(Vec::new()),
        };

        let mut stmt = self.conn.prepare(
            "SELECT word2, similarity_score FROM word_similarity
             WHERE word1 = ?1 AND similarity_score >= ?2
             ORDER BY similarity_score DESC
             LIMIT ?3",
        )?;

        let rows = stmt
            .query_map(
                params![word, min_similarity, limit as i64],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn score_between(&self, a: &str, b: &str) -> Result<Option<f64>> {
        let (a, b) = match (normalize_word(a), normalize_word(b)) {
            (Some(a), Some(b)) => (a, b),
            _ => return Ok(None),
        };

        self.conn
            .query_row(
                "SELECT similarity_score FROM word_similarity WHERE word1 = ?1 AND word2 = ?2",
                params![a, b],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    fn remove_edges_for(&mut self, word: &str) -> Result<()> {
        let word = Self::normalized(word)?;
        self.conn.execute(
            "DELETE FROM word_similarity WHERE word1 = ?1 OR word2 = ?1",
            params![word],
        )?;
        Ok(())
    }
}

impl EmbeddingRepository for SqliteRepository {
    fn save_embedding(&mut self, word: &str, vector: &[f32]) -> Result<()> {
        let word = Self::normalized(word)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO word_embeddings (word, embedding) VALUES (?1, ?2)",
            params![word, vector_to_blob(vector)],
        )?;
        Ok(())
    }

    fn load_embedding(&self, word: &str) -> Result<Option<Vec<f32>>> {
        let word = match normalize_word(word) {
            Some(word) => word,
            None => return Ok(None),
        };

        let blob: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT embedding FROM word_embeddings WHERE word = ?1",
                params![word],
                |row| row.get(0),
            )
            .optional()?;

        Ok(blob.as_deref().and_then(blob_to_vector))
    }

    fn embeddings_present(&self) -> Result<bool> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM word_embeddings", [], |row| row.get(0))?;
        Ok(count > 0)
    }

    fn words_without_embeddings(&self, words: &[String]) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        for word in Self::normalize_list(words) {
            let present: Option<i64> = self
                .conn
                .query_row(
                    "SELECT 1 FROM word_embeddings WHERE word = ?1",
                    params![word],
                    |row| row.get(0),
                )
                .optional()?;
            if present.is_none() {
                missing.push(word);
            }
        }
        Ok(missing)
    }

    fn semantic_neighbors(
        &self,
        word: &str,
        min_similarity: f64,
        limit: usize,
    ) -> Result<Vec<(String, f64)>> {
        let word = match normalize_word(word) {
            Some(word) => word,
            None => return Ok(Vec::new()),
        };
        let target = match self.load_embedding(&word)? {
            Some(vector) => vector,
            None => return Ok(Vec::new()),
        };

        let mut stmt = self
            .conn
            .prepare("SELECT word, embedding FROM word_embeddings WHERE word != ?1")?;
        let rows = stmt
            .query_map(params![word], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut scored: Vec<(String, f64)> = rows
            .into_iter()
            .filter_map(|(other, blob)| {
                let vector = blob_to_vector(&blob)?;
                let score = cosine_similarity(&target, &vector);
                (score >= min_similarity).then_some((other, score))
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }
}

impl EmbeddingProvider for SqliteRepository {
    fn get_embedding(&self, word: &str) -> Option<Vec<f32>> {
        match self.load_embedding(word) {
            Ok(vector) => vector,
            Err(error) => {
                tracing::warn!(%word, %error, "embedding lookup failed");
                None
            }
        }
    }

    fn has_embeddings(&self) -> bool {
        self.embeddings_present().unwrap_or(false)
    }
}

impl ContentRepository for SqliteRepository {
    fn save_content(&mut self, content: &WordContent) -> Result<()> {
        let word = Self::normalized(&content.word)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO word_content (word, definition, example_sentence, generated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                word,
                content.definition,
                content.example_sentence,
                format_timestamp(content.generated_at),
            ],
        )?;
        Ok(())
    }

    fn get_content(&self, word: &str) -> Result<Option<WordContent>> {
        let word = match normalize_word(word) {
            Some(word) => word,
            None => return Ok(None),
        };

        self.conn
            .query_row(
                "SELECT word, definition, example_sentence, generated_at
                 FROM word_content WHERE word = ?1",
                params![word],
                |row| {
                    Ok(WordContent {
                        word: row.get(0)?,
                        definition: row.get(1)?,
                        example_sentence: row.get(2)?,
                        generated_at: row
                            .get::<_, String>(3)
                            .map(|s| parse_timestamp(&s).unwrap_or_default())?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }
}
