//! Reconciliation of the authoritative word list against the stores.

use std::collections::BTreeSet;

use crate::db::{DbError, ProgressFn, SimilarityRepository, SqliteRepository, StatsRepository};

type Result<T> = std::result::Result<T, DbError>;

/// Knobs for one reconciliation run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Remove stored words missing from the authoritative list.
    pub remove_missing: bool,
    /// Score each newly added word against the full post-sync set.
    pub update_similarities: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            remove_missing: true,
            update_similarities: true,
        }
    }
}

/// What one reconciliation run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct SyncReport {
    pub added: usize,
    pub removed: usize,
    pub similarities_added: usize,
}

/// Synchronize the stores with the authoritative word list.
///
/// Input is normalized (trim, lowercase, drop empties, dedupe). Additions
/// and removals apply in a single transaction: on any storage failure the
/// whole diff rolls back and partial sync state is never observable.
/// New words are scored against the full post-sync set, which includes
/// stray stored words kept by `remove_missing: false`.
/// Similarity updates for new words run after the commit; edges briefly
/// missing for brand-new words are a tolerated, self-healing state.
///
/// Idempotent: a second run with the same list reports all zeros.
pub fn sync_word_list(
    repo: &mut SqliteRepository,
    authoritative_words: &[String],
    options: &SyncOptions,
    mut progress: Option<ProgressFn>,
) -> Result<SyncReport> {
    let target: BTreeSet<String> = authoritative_words
        .iter()
        .filter_map(|w| spelldrill_core::types::normalize_word(w))
        .collect();
    let existing: BTreeSet<String> = repo.word_keys()?.into_iter().collect();

    let to_add: Vec<String> = target.difference(&existing).cloned().collect();
    let to_remove: Vec<String> = if options.remove_missing {
        existing.difference(&target).cloned().collect()
    } else {
        Vec::new()
    };

    repo.apply_word_list_changes(&to_add, &to_remove)?;

    let mut report = SyncReport {
        added: to_add.len(),
        removed: to_remove.len(),
        similarities_added: 0,
    };

    if options.update_similarities && !to_add.is_empty() {
        // The post-sync set: the target plus any strays kept in the store.
        let mut post_sync = target;
        if !options.remove_missing {
            post_sync.extend(existing);
        }
        let all_words: Vec<String> = post_sync.into_iter().collect();
        for word in &to_add {
            report.similarities_added +=
                repo.add_word_similarities(word, &all_words, progress.as_deref_mut())?;
        }
    }

    if report.added > 0 || report.removed > 0 {
        tracing::info!(
            added = report.added,
            removed = report.removed,
            similarities = report.similarities_added,
            "synchronized word list"
        );
    }

    Ok(report)
}
