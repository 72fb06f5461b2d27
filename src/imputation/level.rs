/// Time-weighted linear interpolation of level gaps.
///
/// Each gap is filled from its nearest known neighbours on both sides,
/// weighted by elapsed time rather than row count, so irregular sampling
/// does not skew the result. The neighbours are found in a single forward
/// sweep over the known indices.
///
/// Gaps at the very start or end of the series have no anchor on one side.
/// They are left as gaps and reported as `BoundaryGap`; no value is guessed.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::model::{FillReport, GapIssue, ImputationError, Point, Series};

/// Fills every interior gap of `level`.
pub fn fill_level(level: &Series) -> FillReport {
    let points = level.points();
    let known: Vec<(usize, NaiveDateTime, f64)> = points
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.value.map(|v| (i, p.timestamp, v)))
        .collect();

    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    let mut issues = Vec::new();
    let mut filled = 0;
    // known[next] is the first known index after the current position
    let mut next = 0;

    for (i, point) in points.iter().enumerate() {
        if point.value.is_some() {
            out.push(*point);
            continue;
        }
        while next < known.len() && known[next].0 < i {
            next += 1;
        }
        let prior = next.checked_sub(1).map(|k| (known[k].1, known[k].2));
        let posterior = known.get(next).map(|&(_, t, v)| (t, v));

        match interpolate_between(prior, posterior, point.timestamp) {
            Ok(value) => {
                out.push(Point::known(point.timestamp, value));
                filled += 1;
            }
            Err(error) => {
                out.push(*point);
                issues.push(GapIssue { timestamp: point.timestamp, error });
            }
        }
    }

    if !issues.is_empty() {
        debug!(filled, unresolved = issues.len(), "level gaps left unfilled");
    }

    FillReport { series: Series::from_sorted(out), filled, issues }
}

fn interpolate_between(
    prior: Option<(NaiveDateTime, f64)>,
    posterior: Option<(NaiveDateTime, f64)>,
    at: NaiveDateTime,
) -> Result<f64, ImputationError> {
    match (prior, posterior) {
        (Some((t0, v0)), Some((t1, v1))) => interpolate(t0, v0, t1, v1, at),
        (p, q) => Err(ImputationError::BoundaryGap {
            prior: p.map(|(t, _)| t),
            posterior: q.map(|(t, _)| t),
        }),
    }
}

/// Linear interpolation between `(t0, v0)` and `(t1, v1)` evaluated at `at`.
///
/// # Errors
/// `DegenerateInterpolation` when `t0 == t1`.
pub fn interpolate(
    t0: NaiveDateTime,
    v0: f64,
    t1: NaiveDateTime,
    v1: f64,
    at: NaiveDateTime,
) -> Result<f64, ImputationError> {
    let span = seconds_between(t0, t1);
    if span == 0.0 {
        return Err(ImputationError::DegenerateInterpolation { prior: t0, posterior: t1 });
    }
    let before = seconds_between(t0, at);
    let after = seconds_between(at, t1);
    Ok((v0 * after + v1 * before) / span)
}

fn seconds_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}
