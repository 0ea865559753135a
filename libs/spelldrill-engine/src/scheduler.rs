//! Batch selection: seed pick, similarity-biased pooling, weighted sampling.

use std::collections::HashSet;

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use spelldrill_core::sampling::{weighted_index, weighted_sample};
use spelldrill_core::weight::selection_weight;

use crate::db::{
    DbError, EmbeddingRepository, SimilarityRepository, SqliteRepository, StatsRepository,
};

type Result<T> = std::result::Result<T, DbError>;

/// Tunables for one scheduler instance.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Words per practice batch.
    pub batch_size: usize,
    /// Maximum times a word may be scheduled per calendar day.
    pub daily_quota: u32,
    /// Neighbor cutoff for the candidate pool.
    pub min_similarity: f64,
    /// Chance of pooling by semantic (cosine) neighbors instead of spelling
    /// neighbors when the seed has an embedding.
    pub semantic_pool_probability: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            daily_quota: 4,
            min_similarity: 0.3,
            semantic_pool_probability: 0.5,
        }
    }
}

/// Builds the candidate pool around a seed word.
///
/// The seed + neighbor pool is a greedy heuristic, not optimal clustering;
/// keeping it behind a trait lets alternative pooling (say, clustering on
/// embeddings) drop in without touching scheduler control flow.
pub trait PoolingStrategy {
    fn build_pool(
        &self,
        repo: &SqliteRepository,
        seed: &str,
        available: &[String],
        batch_size: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<String>>;
}

/// Default pooling: stored spelling-similarity neighbors of the seed, with a
/// configurable chance of switching to semantic neighbors when the seed has
/// an embedding. A policy switch, not a different algorithm.
#[derive(Debug, Clone)]
pub struct SimilarityPooling {
    pub min_similarity: f64,
    pub semantic_probability: f64,
}

impl PoolingStrategy for SimilarityPooling {
    fn build_pool(
        &self,
        repo: &SqliteRepository,
        seed: &str,
        available: &[String],
        batch_size: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<String>> {
        let fetch_limit = batch_size * 3;
        let pool_cap = batch_size * 2;

        let use_semantic = self.semantic_probability > 0.0
            && rng.gen_bool(self.semantic_probability.clamp(0.0, 1.0))
            && repo.load_embedding(seed)?.is_some();

        let mut neighbors = if use_semantic {
            repo.semantic_neighbors(seed, self.min_similarity, fetch_limit)?
        } else {
            Vec::new()
        };
        if neighbors.is_empty() {
            // No semantic data (or the spelling branch): stored edges.
            neighbors = repo.neighbors(seed, self.min_similarity, fetch_limit)?;
        }

        let available_set: HashSet<&str> = available.iter().map(String::as_str).collect();

        let mut pool = vec![seed.to_string()];
        for (word, _score) in neighbors {
            if pool.len() >= pool_cap {
                break;
            }
            if word != seed && available_set.contains(word.as_str()) {
                pool.push(word);
            }
        }

        // Too few similar candidates: top up with random available words.
        if pool.len() < batch_size {
            let pooled: HashSet<&str> = pool.iter().map(String::as_str).collect();
            let mut rest: Vec<&String> =
                available.iter().filter(|w| !pooled.contains(w.as_str())).collect();
            rest.shuffle(rng);
            for word in rest {
                if pool.len() >= batch_size {
                    break;
                }
                pool.push(word.clone());
            }
        }

        Ok(pool)
    }
}

/// Selects the next practice batch from candidate words.
pub struct BatchScheduler<P: PoolingStrategy = SimilarityPooling> {
    config: SchedulerConfig,
    pooling: P,
}

impl BatchScheduler<SimilarityPooling> {
    pub fn new(config: SchedulerConfig) -> Self {
        let pooling = SimilarityPooling {
            min_similarity: config.min_similarity,
            semantic_probability: config.semantic_pool_probability,
        };
        Self { config, pooling }
    }
}

impl<P: PoolingStrategy> BatchScheduler<P> {
    pub fn with_pooling(config: SchedulerConfig, pooling: P) -> Self {
        Self { config, pooling }
    }

    /// Pick the next batch, ordered for presentation.
    ///
    /// Empty when nothing is left to practice today; never larger than the
    /// configured batch size; partial batches are valid.
    pub fn select_batch(
        &self,
        repo: &SqliteRepository,
        candidates: &[String],
        rng: &mut dyn RngCore,
    ) -> Result<Vec<String>> {
        let available = repo.filter_by_daily_limit(candidates, self.config.daily_quota)?;
        if available.is_empty() {
            tracing::debug!("no words under the daily quota; empty batch");
            return Ok(Vec::new());
        }

        if available.len() <= self.config.batch_size {
            let mut batch = available;
            batch.shuffle(rng);
            return Ok(batch);
        }

        let now = Utc::now();
        let mut weights = Vec::with_capacity(available.len());
        for word in &available {
            let stats = repo.get_word(word)?;
            weights.push(selection_weight(stats.as_ref(), now));
        }

        // weighted_index only returns None for an empty slice, checked above.
        let seed_index = weighted_index(&weights, rng)
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))?;
        let seed = available[seed_index].clone();
        tracing::debug!(%seed, available = available.len(), "picked seed word");

        let pool =
            self.pooling
                .build_pool(repo, &seed, &available, self.config.batch_size, rng)?;

        let mut batch = if pool.len() <= self.config.batch_size {
            pool
        } else {
            let weighted: Vec<(String, f64)> = pool
                .into_iter()
                .map(|word| {
                    let weight = available
                        .iter()
                        .position(|w| *w == word)
                        .map(|i| weights[i])
                        .unwrap_or(spelldrill_core::weight::MIN_SEEN_WEIGHT);
                    (word, weight)
                })
                .collect();
            weighted_sample(&weighted, self.config.batch_size, rng)
        };

        // Presentation order must carry no weight signal.
        batch.shuffle(rng);
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn strings(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn scheduler(batch_size: usize) -> BatchScheduler {
        BatchScheduler::new(SchedulerConfig {
            batch_size,
            ..SchedulerConfig::default()
        })
    }

    #[test]
    fn empty_candidates_give_empty_batch() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let batch = scheduler(4).select_batch(&repo, &[], &mut rng).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn small_candidate_set_is_returned_whole() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let words = strings(&["cat", "bat", "hat"]);

        let mut batch = scheduler(4).select_batch(&repo, &words, &mut rng).unwrap();
        batch.sort();
        assert_eq!(batch, strings(&["bat", "cat", "hat"]));
    }

    #[test]
    fn batch_never_exceeds_size_or_repeats() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        let words: Vec<String> = (0..30).map(|i| format!("word{i:02}")).collect();
        repo.rebuild_all(&words, None).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let scheduler = scheduler(4);
        for _ in 0..50 {
            let batch = scheduler.select_batch(&repo, &words, &mut rng).unwrap();
            assert!(batch.len() <= 4);
            let unique: HashSet<&String> = batch.iter().collect();
            assert_eq!(unique.len(), batch.len());
            for word in &batch {
                assert!(words.contains(word));
            }
        }
    }

    #[test]
    fn quota_exhausted_words_are_excluded() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        let words: Vec<String> = (0..10).map(|i| format!("word{i}")).collect();
        repo.rebuild_all(&words, None).unwrap();

        let config = SchedulerConfig {
            batch_size: 4,
            daily_quota: 1,
            ..SchedulerConfig::default()
        };
        let scheduler = BatchScheduler::new(config);

        for word in &words[..8] {
            repo.increment_daily_count(word).unwrap();
        }

        let mut rng = StdRng::seed_from_u64(4);
        let mut batch = scheduler.select_batch(&repo, &words, &mut rng).unwrap();
        batch.sort();
        assert_eq!(batch, strings(&["word8", "word9"]));

        repo.increment_daily_count("word8").unwrap();
        repo.increment_daily_count("word9").unwrap();
        let batch = scheduler.select_batch(&repo, &words, &mut rng).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn missing_similarity_data_still_fills_batches() {
        // No edges at all: pooling tops up from random available words.
        let repo = SqliteRepository::open_in_memory().unwrap();
        let words: Vec<String> = (0..20).map(|i| format!("word{i:02}")).collect();
        let mut rng = StdRng::seed_from_u64(5);

        let batch = scheduler(4).select_batch(&repo, &words, &mut rng).unwrap();
        assert_eq!(batch.len(), 4);
    }

    #[test]
    fn pool_is_biased_toward_seed_neighbors() {
        struct FixedPool(Vec<String>);
        impl PoolingStrategy for FixedPool {
            fn build_pool(
                &self,
                _repo: &SqliteRepository,
                _seed: &str,
                _available: &[String],
                _batch_size: usize,
                _rng: &mut dyn RngCore,
            ) -> Result<Vec<String>> {
                Ok(self.0.clone())
            }
        }

        let repo = SqliteRepository::open_in_memory().unwrap();
        let words: Vec<String> = (0..20).map(|i| format!("word{i:02}")).collect();
        let pool = strings(&["word00", "word01", "word02"]);
        let scheduler = BatchScheduler::with_pooling(
            SchedulerConfig {
                batch_size: 4,
                ..SchedulerConfig::default()
            },
            FixedPool(pool.clone()),
        );

        let mut rng = StdRng::seed_from_u64(6);
        let mut batch = scheduler.select_batch(&repo, &words, &mut rng).unwrap();
        batch.sort();
        // Pool smaller than the batch size is accepted as-is.
        assert_eq!(batch, pool);
    }

    #[test]
    fn semantic_pooling_uses_embeddings_when_present() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        let words = strings(&["happy", "joyful", "sad", "melancholy", "run", "sprint"]);
        repo.save_embedding("happy", &[1.0, 0.0]).unwrap();
        repo.save_embedding("joyful", &[0.95, 0.05]).unwrap();
        repo.save_embedding("sad", &[-1.0, 0.0]).unwrap();

        let pooling = SimilarityPooling {
            min_similarity: 0.3,
            semantic_probability: 1.0,
        };
        let mut rng = StdRng::seed_from_u64(7);
        let pool = pooling.build_pool(&repo, "happy", &words, 2, &mut rng).unwrap();

        assert_eq!(pool[0], "happy");
        assert!(pool.contains(&"joyful".to_string()));
        assert!(!pool.contains(&"sad".to_string()));
    }
}
