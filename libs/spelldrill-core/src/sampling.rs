//! Weighted random selection primitives used by the batch scheduler.

use std::cmp::Ordering;

use rand::Rng;

/// Floor applied to weights before exponentiation so a zero weight cannot
/// divide by zero.
const WEIGHT_EPSILON: f64 = 1e-9;

/// Cumulative-weight draw: pick one index with probability proportional to
/// its weight.
///
/// Non-finite and non-positive weights contribute nothing. A zero total
/// weight falls back to a uniform pick rather than failing. Returns `None`
/// only for an empty slice.
pub fn weighted_index<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }

    let total: f64 = weights
        .iter()
        .filter(|w| w.is_finite() && **w > 0.0)
        .sum();
    if total <= 0.0 {
        return Some(rng.gen_range(0..weights.len()));
    }

    let target = rng.gen_range(0.0..total);
    let mut running = 0.0;
    for (index, weight) in weights.iter().enumerate() {
        if weight.is_finite() && *weight > 0.0 {
            running += weight;
        }
        if running >= target {
            return Some(index);
        }
    }

    // Floating-point accumulation can land a hair short of `total`.
    Some(weights.len() - 1)
}

/// Weighted sampling without replacement (Efraimidis-Spirakis).
///
/// Each item draws `u ~ U(0,1)` and is keyed by `u^(1/w)`; the top `k` keys
/// form an unbiased weighted sample in O(n log n) with no rejection loop.
pub fn weighted_sample<T: Clone, R: Rng + ?Sized>(
    items: &[(T, f64)],
    k: usize,
    rng: &mut R,
) -> Vec<T> {
    let mut keyed: Vec<(f64, usize)> = items
        .iter()
        .enumerate()
        .map(|(index, (_, weight))| {
            let weight = weight.max(WEIGHT_EPSILON);
            let u: f64 = rng.gen();
            (u.powf(1.0 / weight), index)
        })
        .collect();

    keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    keyed
        .into_iter()
        .take(k)
        .map(|(_, index)| items[index].0.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn empty_slice_yields_none() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(weighted_index(&[], &mut rng), None);
    }

    #[test]
    fn zero_total_weight_falls_back_to_uniform() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let index = weighted_index(&[0.0, 0.0, 0.0], &mut rng).unwrap();
            assert!(index < 3);
            seen.insert(index);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn heavy_weight_wins_most_draws() {
        let mut rng = StdRng::seed_from_u64(3);
        let weights = [100.0, 1.0, 1.0];
        let mut hits = [0usize; 3];
        for _ in 0..1000 {
            hits[weighted_index(&weights, &mut rng).unwrap()] += 1;
        }
        assert!(hits[0] > hits[1] + hits[2]);
    }

    #[test]
    fn sample_has_no_duplicates_and_respects_k() {
        let mut rng = StdRng::seed_from_u64(4);
        let items: Vec<(String, f64)> = (0..20)
            .map(|i| (format!("word{i}"), 1.0 + i as f64))
            .collect();

        let picked = weighted_sample(&items, 5, &mut rng);
        assert_eq!(picked.len(), 5);
        let unique: HashSet<&String> = picked.iter().collect();
        assert_eq!(unique.len(), picked.len());
    }

    #[test]
    fn sample_larger_than_population_returns_everything() {
        let mut rng = StdRng::seed_from_u64(5);
        let items = vec![("a".to_string(), 1.0), ("b".to_string(), 2.0)];
        let picked = weighted_sample(&items, 10, &mut rng);
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn zero_weight_item_can_still_be_sampled() {
        // The epsilon floor keeps zero-weight items eligible when k covers
        // the whole population.
        let mut rng = StdRng::seed_from_u64(6);
        let items = vec![("a".to_string(), 0.0), ("b".to_string(), 1.0)];
        let picked = weighted_sample(&items, 2, &mut rng);
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn heavier_items_appear_more_often_in_samples() {
        let mut rng = StdRng::seed_from_u64(7);
        let items = vec![
            ("heavy".to_string(), 50.0),
            ("light1".to_string(), 1.0),
            ("light2".to_string(), 1.0),
            ("light3".to_string(), 1.0),
        ];
        let mut heavy_hits = 0;
        for _ in 0..500 {
            if weighted_sample(&items, 1, &mut rng)[0] == "heavy" {
                heavy_hits += 1;
            }
        }
        assert!(heavy_hits > 350);
    }
}
