/// Sliding-window trend labels for level readings.
///
/// For point `i` the window is `[i - horizon, i + horizon]`, clipped at the
/// series edges. The first differences inside the window are counted as
/// non-negative (`positives`) or negative (`negatives`); `epsilon` is how
/// many differences may go against the trend before the point is called an
/// extremum.
///
/// Counts come from a prefix sum over the difference signs, so labelling a
/// series is O(n) regardless of `horizon`.

use crate::model::{ImputationError, MonotonicityLabel};

/// Labels every value of `levels`.
///
/// # Errors
/// `ImputationError::EmptyWindow` when a window holds fewer than two values
/// (series shorter than two points, or `horizon == 0`).
pub fn classify(
    levels: &[f64],
    horizon: usize,
    epsilon: usize,
) -> Result<Vec<MonotonicityLabel>, ImputationError> {
    let n = levels.len();
    if n < 2 || horizon == 0 {
        return Err(ImputationError::EmptyWindow { index: 0, horizon, len: n });
    }

    // non_negative[k] = number of non-negative diffs among diffs[0..k]
    let mut non_negative = Vec::with_capacity(n);
    non_negative.push(0usize);
    for pair in levels.windows(2) {
        let last = non_negative[non_negative.len() - 1];
        non_negative.push(last + usize::from(pair[1] - pair[0] >= 0.0));
    }

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(horizon);
            let hi = (i + horizon).min(n - 1);
            let len = hi - lo;
            if len == 0 {
                return Err(ImputationError::EmptyWindow { index: i, horizon, len: n });
            }
            let positives = non_negative[hi] - non_negative[lo];
            Ok(label_window(positives, len - positives, epsilon))
        })
        .collect()
}

/// Labels one window from its difference counts.
///
/// Falling is tested first, then rising. Only when `epsilon` is at least
/// the window length, so that both tests pass whatever the counts, does the
/// larger count decide; a tie reads as falling.
pub fn label_window(positives: usize, negatives: usize, epsilon: usize) -> MonotonicityLabel {
    let len = positives + negatives;
    let falling = negatives + epsilon >= len;
    let rising = positives + epsilon >= len;

    match (falling, rising) {
        (true, true) if epsilon >= len && positives > negatives => MonotonicityLabel::Rising,
        (true, _) => MonotonicityLabel::Falling,
        (false, true) => MonotonicityLabel::Rising,
        (false, false) => MonotonicityLabel::Extremum,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MonotonicityLabel::*;

    #[test]
    fn test_strictly_increasing_is_rising_for_any_epsilon() {
        let levels: Vec<f64> = (0..20).map(|i| 0.1 * i as f64).collect();
        for epsilon in 0..30 {
            let labels = classify(&levels, 5, epsilon).unwrap();
            assert!(labels.iter().all(|&l| l == Rising), "epsilon {}", epsilon);
        }
    }

    #[test]
    fn test_strictly_decreasing_is_falling_for_any_epsilon() {
        let levels: Vec<f64> = (0..20).map(|i| 2.0 - 0.1 * i as f64).collect();
        for epsilon in 0..30 {
            let labels = classify(&levels, 5, epsilon).unwrap();
            assert!(labels.iter().all(|&l| l == Falling), "epsilon {}", epsilon);
        }
    }

    #[test]
    fn test_flat_level_counts_as_rising() {
        // Zero differences are non-negative.
        let labels = classify(&[0.5; 8], 2, 0).unwrap();
        assert!(labels.iter().all(|&l| l == Rising));
    }

    #[test]
    fn test_pump_cycle_peak_is_extremum() {
        // Rise while the pump is off, then a sharp drawdown.
        let levels = [0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.5, 0.3, 0.1, 0.05, 0.02];
        let labels = classify(&levels, 2, 0).unwrap();
        assert_eq!(labels[0], Rising);
        assert_eq!(labels[2], Rising);
        assert_eq!(labels[5], Extremum);
        assert_eq!(labels[8], Falling);
        assert_eq!(labels[10], Falling);
    }

    #[test]
    fn test_epsilon_tolerates_noise() {
        // One dip inside an otherwise rising window of four differences.
        let levels = [0.1, 0.2, 0.15, 0.3, 0.4];
        assert_eq!(classify(&levels, 2, 0).unwrap()[2], Extremum);
        assert_eq!(classify(&levels, 2, 1).unwrap()[2], Rising);
    }

    #[test]
    fn test_boundary_windows_shrink() {
        // Index 0 sees three differences instead of six.
        let levels = [1.0, 0.9, 1.5, 2.0, 2.5];
        let labels = classify(&levels, 3, 0).unwrap();
        assert_eq!(labels[0], Extremum);
        assert_eq!(labels[4], Rising);
    }

    #[test]
    fn test_empty_window_fails_explicitly() {
        assert!(matches!(
            classify(&[0.4], 5, 4),
            Err(ImputationError::EmptyWindow { len: 1, .. })
        ));
        assert!(matches!(
            classify(&[0.4, 0.5, 0.6], 0, 4),
            Err(ImputationError::EmptyWindow { horizon: 0, .. })
        ));
        assert!(classify(&[], 5, 4).is_err());
    }

    #[test]
    fn test_mixed_boundary_window_checks_falling_first() {
        // Index 0 sees + + - + - : two negatives reach len - epsilon = 1.
        let levels = [0.0, 0.1, 0.2, 0.15, 0.25, 0.2, 0.3, 0.4, 0.35, 0.5];
        let labels = classify(&levels, 5, 4).unwrap();
        assert_eq!(labels[0], Falling);
        assert_eq!(label_window(3, 2, 4), Falling);
        assert_eq!(label_window(5, 0, 4), Rising);
    }

    #[test]
    fn test_label_window_tie_with_large_epsilon_is_falling() {
        assert_eq!(label_window(3, 3, 10), Falling);
        assert_eq!(label_window(4, 2, 10), Rising);
    }
}
