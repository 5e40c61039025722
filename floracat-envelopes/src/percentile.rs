//! Exact order-statistics percentile, with the under-20-sample fallback
//! the occurrence-based deriver's tie-break policy requires.

/// Minimum sample count below which p05/p95 fall back to min/max.
pub const PERCENTILE_FALLBACK_MIN_SAMPLES: usize = 20;

/// Linear-interpolation percentile (`p` in `[0, 100]`) over a sorted copy
/// of `values`. Panics if `values` is empty — callers only invoke this
/// after confirming the minimum-sample threshold for the deriver.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

/// p05/p95 pair, falling back to min/max under
/// [`PERCENTILE_FALLBACK_MIN_SAMPLES`] and flagging the fallback.
pub fn p05_p95_with_fallback(values: &[f64]) -> (f64, f64, bool) {
    if values.len() < PERCENTILE_FALLBACK_MIN_SAMPLES {
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        (min, max, true)
    } else {
        (percentile(values, 5.0), percentile(values, 95.0), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_of_sorted_run_matches_hand_computation() {
        let values: Vec<f64> = (1..=100).map(|n| n as f64).collect();
        assert!((percentile(&values, 50.0) - 50.5).abs() < 1e-9);
    }

    #[test]
    fn small_sample_falls_back_to_min_max() {
        let values = vec![1.0, 5.0, 3.0];
        let (p05, p95, fallback) = p05_p95_with_fallback(&values);
        assert!(fallback);
        assert_eq!(p05, 1.0);
        assert_eq!(p95, 5.0);
    }

    #[test]
    fn large_sample_uses_exact_percentile() {
        let values: Vec<f64> = (1..=100).map(|n| n as f64).collect();
        let (p05, p95, fallback) = p05_p95_with_fallback(&values);
        assert!(!fallback);
        assert!(p05 < 10.0);
        assert!(p95 > 90.0);
    }
}
