//! Selection weight derived from a word's statistics snapshot.

use chrono::{DateTime, Utc};

use crate::types::WordRecord;

/// Weight assigned to a word with no statistics at all.
///
/// 10x the maximum achievable seen weight (10.0 difficulty + 3.0 streak
/// bonus + 2.0 recency cap), so unseen words dominate selection until first
/// practiced.
pub const UNSEEN_WEIGHT: f64 = 150.0;

/// Floor for seen words; every word keeps a nonzero selection probability.
pub const MIN_SEEN_WEIGHT: f64 = 0.1;

const RECENCY_PER_DAY: f64 = 0.1;
const RECENCY_CAP: f64 = 2.0;

/// Selection weight for one word: always strictly positive.
///
/// Seen words combine three additive signals so each stays auditable:
/// intrinsic difficulty, short-term streak, and long-term staleness.
pub fn selection_weight(stats: Option<&WordRecord>, now: DateTime<Utc>) -> f64 {
    let record = match stats {
        Some(record) => record,
        None => return UNSEEN_WEIGHT,
    };

    let weight = record.difficulty_score
        + consecutive_bonus(record.consecutive_correct)
        + recency_bonus(record.last_seen, now);

    weight.max(MIN_SEEN_WEIGHT)
}

/// Strictly decreasing step function that front-loads recently-missed words.
fn consecutive_bonus(streak: u32) -> f64 {
    match streak {
        0 => 3.0,
        1 => 1.5,
        2 => 0.5,
        _ => 0.0,
    }
}

/// Staleness boost, capped so very old words do not dominate on recency
/// alone.
fn recency_bonus(last_seen: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let last_seen = match last_seen {
        Some(ts) => ts,
        None => return 0.0,
    };

    let days = (now - last_seen).num_days().max(0) as f64;
    (days * RECENCY_PER_DAY).min(RECENCY_CAP)
}
