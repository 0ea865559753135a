//! Persistence and orchestration for adaptive spelling practice.
//!
//! Builds on `spelldrill-core`:
//! - SQLite-backed word statistics, similarity matrix, embeddings, and
//!   auxiliary content (`db`)
//! - Batch selection with similarity-biased candidate pooling (`scheduler`)
//! - Transactional word-list reconciliation (`reconcile`)
//! - Background auxiliary-content prefetch (`prefetch`)

pub mod db;
pub mod prefetch;
pub mod reconcile;
pub mod scheduler;

pub use db::{
    ContentRepository, DbError, EmbeddingRepository, ProgressFn, SimilarityRepository,
    SqliteRepository, StatsRepository, WordContent,
};
pub use prefetch::{ContentPrefetcher, PrefetchHandle};
pub use reconcile::{sync_word_list, SyncOptions, SyncReport};
pub use scheduler::{BatchScheduler, PoolingStrategy, SchedulerConfig, SimilarityPooling};
