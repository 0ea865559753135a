//! Core spelling-drill library shared by the persistence engine and callers.
//!
//! Provides:
//! - Per-word statistics model and the difficulty-update rule
//! - Composite string similarity (Levenshtein + prefix/suffix/length bonuses)
//! - Selection weight model (difficulty + streak + staleness)
//! - Weighted sampling primitives (cumulative draw, Efraimidis-Spirakis)
//! - Embedding helpers (cosine similarity, f32 blob codec, provider trait)

pub mod embedding;
pub mod metric;
pub mod sampling;
pub mod types;
pub mod weight;

pub use embedding::{blob_to_vector, cosine_similarity, vector_to_blob, EmbeddingProvider};
pub use metric::{levenshtein_distance, similarity};
pub use sampling::{weighted_index, weighted_sample};
pub use types::{normalize_word, WordRecord};
pub use weight::{selection_weight, UNSEEN_WEIGHT};
