//! Per-word statistics and the outcome-update rule.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lower clamp for the difficulty score.
pub const DIFFICULTY_MIN: f64 = 0.1;
/// Upper clamp for the difficulty score.
pub const DIFFICULTY_MAX: f64 = 10.0;
/// Difficulty assigned to a word that has never been attempted.
pub const DIFFICULTY_INITIAL: f64 = 1.0;

const CORRECT_STEP: f64 = 0.1;
const INCORRECT_STEP: f64 = 0.5;

/// Normalize a raw word into its identity key: trimmed and lower-cased.
/// Returns `None` when nothing remains.
pub fn normalize_word(raw: &str) -> Option<String> {
    let word = raw.trim().to_lowercase();
    if word.is_empty() {
        None
    } else {
        Some(word)
    }
}

/// Persistent statistics for one vocabulary word.
///
/// The word text itself is the identity key; there is no surrogate id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordRecord {
    pub word: String,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub total_appearances: u32,
    pub difficulty_score: f64,
    pub consecutive_correct: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_correct_date: Option<NaiveDate>,
    pub daily_practice_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practice_date: Option<NaiveDate>,
}

impl WordRecord {
    /// Fresh record with default statistics.
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            correct_count: 0,
            incorrect_count: 0,
            total_appearances: 0,
            difficulty_score: DIFFICULTY_INITIAL,
            consecutive_correct: 0,
            last_seen: None,
            last_correct_date: None,
            daily_practice_count: 0,
            practice_date: None,
        }
    }

    /// Apply one practice attempt.
    ///
    /// Correct answers nudge difficulty down by 0.1 and extend the streak;
    /// incorrect answers push it up by 0.5 and reset the streak. Difficulty
    /// stays within [`DIFFICULTY_MIN`, `DIFFICULTY_MAX`] and
    /// `total_appearances` always equals `correct_count + incorrect_count`.
    pub fn apply_outcome(&mut self, correct: bool, now: DateTime<Utc>, today: NaiveDate) {
        self.total_appearances += 1;
        self.last_seen = Some(now);

        if correct {
            self.correct_count += 1;
            self.last_correct_date = Some(today);
            self.difficulty_score = (self.difficulty_score - CORRECT_STEP).max(DIFFICULTY_MIN);
            self.consecutive_correct += 1;
        } else {
            self.incorrect_count += 1;
            self.difficulty_score = (self.difficulty_score + INCORRECT_STEP).min(DIFFICULTY_MAX);
            self.consecutive_correct = 0;
        }
    }

    /// Count one scheduled practice toward the daily quota.
    ///
    /// The counter resets whenever the calendar date changes.
    pub fn bump_daily_count(&mut self, today: NaiveDate) {
        if self.practice_date != Some(today) {
            self.daily_practice_count = 0;
        }
        self.daily_practice_count += 1;
        self.practice_date = Some(today);
    }

    /// Whether the word may still be scheduled today.
    ///
    /// Words never practiced (or last practiced on another date) are always
    /// under the limit.
    pub fn is_under_daily_limit(&self, today: NaiveDate, max_daily: u32) -> bool {
        match self.practice_date {
            Some(date) if date == today => self.daily_practice_count < max_daily,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 24).unwrap()
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_word("  Receive "), Some("receive".to_string()));
        assert_eq!(normalize_word("   "), None);
        assert_eq!(normalize_word(""), None);
    }

    #[test]
    fn counts_stay_consistent_over_mixed_outcomes() {
        let mut record = WordRecord::new("accommodate");
        let now = Utc::now();
        for i in 0..7 {
            record.apply_outcome(i % 3 != 0, now, today());
        }
        assert_eq!(
            record.total_appearances,
            record.correct_count + record.incorrect_count
        );
        assert_eq!(record.total_appearances, 7);
    }

    #[test]
    fn difficulty_clamps_at_bounds() {
        let mut record = WordRecord::new("cat");
        let now = Utc::now();
        for _ in 0..50 {
            record.apply_outcome(true, now, today());
        }
        assert_eq!(record.difficulty_score, DIFFICULTY_MIN);

        for _ in 0..50 {
            record.apply_outcome(false, now, today());
        }
        assert_eq!(record.difficulty_score, DIFFICULTY_MAX);
    }

    #[test]
    fn incorrect_resets_streak() {
        let mut record = WordRecord::new("separate");
        let now = Utc::now();
        record.apply_outcome(true, now, today());
        record.apply_outcome(true, now, today());
        assert_eq!(record.consecutive_correct, 2);
        assert_eq!(record.last_correct_date, Some(today()));

        record.apply_outcome(false, now, today());
        assert_eq!(record.consecutive_correct, 0);
        // The last correct date survives an incorrect attempt.
        assert_eq!(record.last_correct_date, Some(today()));
    }

    #[test]
    fn daily_count_resets_on_new_date() {
        let mut record = WordRecord::new("rhythm");
        let yesterday = today().pred_opt().unwrap();

        record.bump_daily_count(yesterday);
        record.bump_daily_count(yesterday);
        assert_eq!(record.daily_practice_count, 2);
        assert!(record.is_under_daily_limit(today(), 2));

        record.bump_daily_count(today());
        assert_eq!(record.daily_practice_count, 1);
        assert_eq!(record.practice_date, Some(today()));
        assert!(record.is_under_daily_limit(today(), 2));

        record.bump_daily_count(today());
        assert!(!record.is_under_daily_limit(today(), 2));
    }
}
