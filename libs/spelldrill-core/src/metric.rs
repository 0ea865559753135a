//! Composite spelling similarity between two words.

/// Calculate Levenshtein distance between two strings.
///
/// Unit costs for insertion, deletion, and substitution, computed over
/// Unicode scalar values.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    // Use two rows instead of the full matrix for memory efficiency
    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;

        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] {
                0
            } else {
                1
            };

            curr[j] = (prev[j] + 1) // deletion
                .min(curr[j - 1] + 1) // insertion
                .min(prev[j - 1] + cost); // substitution
        }

        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Composite similarity score in [0, 1], rounded to 4 decimal digits.
///
/// Normalized Levenshtein similarity plus three capped bonuses: shared
/// prefix run (x0.2), shared suffix run (x0.2), and length closeness
/// (x0.1). Prefix and suffix runs are measured independently and may
/// overlap on short strings; that overlap is deliberate, preserved
/// behavior. Symmetric, and 1.0 for any non-empty word against itself.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let max_len = a_chars.len().max(b_chars.len());
    if max_len == 0 {
        return 0.0;
    }

    let base = 1.0 - levenshtein_distance(a, b) as f64 / max_len as f64;

    let prefix = common_prefix_len(&a_chars, &b_chars) as f64 / max_len as f64 * 0.2;
    let suffix = common_suffix_len(&a_chars, &b_chars) as f64 / max_len as f64 * 0.2;

    let len_diff = a_chars.len().abs_diff(b_chars.len());
    let length = (1.0 - len_diff as f64 / max_len as f64) * 0.1;

    round4((base + prefix + suffix + length).min(1.0))
}

fn common_prefix_len(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

fn common_suffix_len(a: &[char], b: &[char]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
