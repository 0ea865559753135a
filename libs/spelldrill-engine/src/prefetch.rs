//! Background computation of auxiliary word content.
//!
//! While the caller blocks on user input for the current word, a
//! fire-and-forget task generates its definition and example sentence. The
//! task gets its own storage handle and writes only to the auxiliary
//! `word_content` table, so it never contends with the primary handle or
//! touches stats/similarity rows.

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::db::{ContentRepository, SqliteRepository, WordContent};

/// Spawns background content generation.
pub struct ContentPrefetcher;

/// Join handle for one in-flight generation.
pub struct PrefetchHandle {
    word: String,
    receiver: mpsc::Receiver<Option<WordContent>>,
}

impl ContentPrefetcher {
    /// Start generating content for `word` on a background thread.
    ///
    /// The generator is the external LLM collaborator. Cached content wins:
    /// when a `word_content` row already exists the generator is not called.
    /// Freshly generated content is persisted before being handed back.
    pub fn spawn<G>(db_path: PathBuf, word: &str, generator: G) -> PrefetchHandle
    where
        G: FnOnce(&str) -> Option<WordContent> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let word = word.to_string();
        let thread_word = word.clone();

        thread::spawn(move || {
            let result = generate_and_store(&db_path, &thread_word, generator);
            // The receiver may have timed out and dropped; nothing to do.
            let _ = sender.send(result);
        });

        PrefetchHandle { word, receiver }
    }
}

fn generate_and_store<G>(db_path: &PathBuf, word: &str, generator: G) -> Option<WordContent>
where
    G: FnOnce(&str) -> Option<WordContent>,
{
    let mut repo = match SqliteRepository::open(db_path) {
        Ok(repo) => repo,
        Err(error) => {
            tracing::warn!(%word, %error, "prefetch could not open its store handle");
            return generator(word);
        }
    };

    match repo.get_content(word) {
        Ok(Some(cached)) => return Some(cached),
        Ok(None) => {}
        Err(error) => tracing::warn!(%word, %error, "content cache lookup failed"),
    }

    let content = generator(word)?;
    if let Err(error) = repo.save_content(&content) {
        tracing::warn!(%word, %error, "failed to cache generated content");
    }
    Some(content)
}

impl PrefetchHandle {
    /// Wait up to `timeout` for the background task.
    ///
    /// A task that misses the deadline is abandoned: it may still finish and
    /// cache its row, but its result is discarded and `None` is returned.
    pub fn join_timeout(self, timeout: Duration) -> Option<WordContent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(content) => content,
            Err(_) => {
                tracing::debug!(word = %self.word, "content generation timed out; abandoning");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn content(word: &str, definition: &str) -> WordContent {
        WordContent {
            word: word.to_string(),
            definition: Some(definition.to_string()),
            example_sentence: None,
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn generated_content_is_returned_and_cached() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("practice.db");
        // Create the database up front, as the main handle would have.
        drop(SqliteRepository::open(&db_path).unwrap());

        let handle = ContentPrefetcher::spawn(db_path.clone(), "rhythm", |word| {
            Some(content(word, "a repeated pattern of sound"))
        });
        let fetched = handle.join_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(fetched.word, "rhythm");

        let repo = SqliteRepository::open(&db_path).unwrap();
        let cached = repo.get_content("rhythm").unwrap().unwrap();
        assert_eq!(cached.definition, fetched.definition);
    }

    #[test]
    fn cached_content_short_circuits_the_generator() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("practice.db");
        {
            let mut repo = SqliteRepository::open(&db_path).unwrap();
            repo.save_content(&content("cat", "a small domesticated feline"))
                .unwrap();
        }

        let handle = ContentPrefetcher::spawn(db_path, "cat", |_| {
            panic!("generator must not run for cached words")
        });
        let fetched = handle.join_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(
            fetched.definition.as_deref(),
            Some("a small domesticated feline")
        );
    }

    #[test]
    fn slow_generation_times_out_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("practice.db");
        drop(SqliteRepository::open(&db_path).unwrap());

        let handle = ContentPrefetcher::spawn(db_path, "glacial", |word| {
            thread::sleep(Duration::from_millis(500));
            Some(content(word, "slow"))
        });
        assert!(handle.join_timeout(Duration::from_millis(20)).is_none());
    }

    #[test]
    fn generator_returning_none_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("practice.db");
        drop(SqliteRepository::open(&db_path).unwrap());

        let handle = ContentPrefetcher::spawn(db_path, "cat", |_| None);
        assert!(handle.join_timeout(Duration::from_secs(5)).is_none());
    }
}
