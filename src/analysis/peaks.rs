/// Local maxima filtered by topographic prominence.
///
/// A sample is a local maximum when its left neighbour is strictly lower and
/// the first differing sample to its right is strictly lower too. Flat tops
/// report their middle index (rounded down); the first and last samples are
/// never maxima.
///
/// Prominence is how far a peak stands above the higher of the two lowest
/// points reached before the signal climbs above the peak again on either
/// side (or the series ends).

/// Indices of local maxima whose prominence is at least `min_prominence`.
pub fn find_peaks(values: &[f64], min_prominence: f64) -> Vec<usize> {
    local_maxima(values)
        .into_iter()
        .filter(|&peak| prominence(values, peak) >= min_prominence)
        .collect()
}

/// Indices of local minima, i.e. peaks of the negated series.
pub fn find_troughs(values: &[f64], min_prominence: f64) -> Vec<usize> {
    let negated: Vec<f64> = values.iter().map(|v| -v).collect();
    find_peaks(&negated, min_prominence)
}

fn local_maxima(values: &[f64]) -> Vec<usize> {
    let n = values.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }

    let mut i = 1;
    while i < n - 1 {
        if values[i - 1] < values[i] {
            let mut ahead = i + 1;
            while ahead < n - 1 && values[ahead] == values[i] {
                ahead += 1;
            }
            if values[ahead] < values[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Prominence of the sample at `peak`.
pub fn prominence(values: &[f64], peak: usize) -> f64 {
    let height = values[peak];

    let mut left_min = height;
    for &v in values[..=peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in &values[peak..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}
