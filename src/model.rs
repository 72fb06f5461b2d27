/// Core data types for the pump station imputation engine.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O, only types and the small amount of logic needed to
/// keep their invariants (sorted, unique timestamps).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// Sensor quality flag as delivered by the telemetry export (1 = good, 0 = bad).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Quality {
    Good,
    Bad,
}

impl TryFrom<u8> for Quality {
    type Error = String;

    fn try_from(flag: u8) -> Result<Self, Self::Error> {
        match flag {
            1 => Ok(Quality::Good),
            0 => Ok(Quality::Bad),
            other => Err(format!("quality flag must be 0 or 1, got {}", other)),
        }
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> u8 {
        match quality {
            Quality::Good => 1,
            Quality::Bad => 0,
        }
    }
}

/// A single raw measurement from a flow or level sensor.
///
/// `value` is `None` when the export row exists but carries no number.
/// That is different from a measured zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub value: Option<f64>,
    pub quality: Quality,
}

/// One slot of a cleaned series. `value: None` marks an explicit gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub timestamp: NaiveDateTime,
    pub value: Option<f64>,
}

impl Point {
    pub fn known(timestamp: NaiveDateTime, value: f64) -> Self {
        Point { timestamp, value: Some(value) }
    }

    pub fn missing(timestamp: NaiveDateTime) -> Self {
        Point { timestamp, value: None }
    }
}

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

/// Ordered sequence of points with strictly ascending timestamps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    points: Vec<Point>,
}

impl Series {
    /// Builds a series, rejecting unsorted or duplicated timestamps.
    pub fn new(points: Vec<Point>) -> Result<Self, ImputationError> {
        for pair in points.windows(2) {
            if pair[1].timestamp == pair[0].timestamp {
                return Err(ImputationError::DuplicateTimestamp(pair[1].timestamp));
            }
            if pair[1].timestamp < pair[0].timestamp {
                return Err(ImputationError::UnsortedSeries(pair[1].timestamp));
            }
        }
        Ok(Series { points })
    }

    /// Convenience constructor for fully observed data.
    pub fn from_values(samples: &[(NaiveDateTime, f64)]) -> Result<Self, ImputationError> {
        Series::new(samples.iter().map(|&(t, v)| Point::known(t, v)).collect())
    }

    /// Internal constructor for producers that already guarantee ordering.
    pub(crate) fn from_sorted(points: Vec<Point>) -> Self {
        debug_assert!(points.windows(2).all(|p| p[0].timestamp < p[1].timestamp));
        Series { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.points.iter().map(|p| p.timestamp)
    }

    pub fn values(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.points.iter().map(|p| p.value)
    }

    /// Points that carry a value, in order.
    pub fn known(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.points
            .iter()
            .filter_map(|p| p.value.map(|v| (p.timestamp, v)))
    }

    /// Copy of the series without its gaps.
    pub fn known_only(&self) -> Series {
        Series::from_sorted(
            self.points
                .iter()
                .copied()
                .filter(|p| p.value.is_some())
                .collect(),
        )
    }

    pub fn missing_count(&self) -> usize {
        self.points.iter().filter(|p| p.value.is_none()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_count() == 0
    }

    /// All values, failing on the first gap.
    pub fn complete_values(&self) -> Result<Vec<f64>, ImputationError> {
        self.points
            .iter()
            .map(|p| p.value.ok_or(ImputationError::MissingValue(p.timestamp)))
            .collect()
    }

    /// Value at an exact timestamp. `None` both when the slot is absent
    /// and when it exists as a gap.
    pub fn value_at(&self, timestamp: NaiveDateTime) -> Option<f64> {
        self.points
            .binary_search_by(|p| p.timestamp.cmp(&timestamp))
            .ok()
            .and_then(|i| self.points[i].value)
    }
}

/// Flow and level re-indexed onto the union of their timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPair {
    pub flow: Series,
    pub level: Series,
}

impl AlignedPair {
    pub fn len(&self) -> usize {
        self.flow.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flow.is_empty()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.flow.timestamps()
    }
}

// ---------------------------------------------------------------------------
// Labels and estimates
// ---------------------------------------------------------------------------

/// Local trend of a level reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonotonicityLabel {
    Rising,
    Falling,
    Extremum,
}

/// Why a flow gap could not be estimated.
#[derive(Debug, Clone, PartialEq)]
pub enum UnresolvedReason {
    /// No level reading shares the gap's timestamp.
    NoLevelReading,
    /// No non-rising level reading with flow lies within tolerance.
    NoAnalogues { level: f64 },
    /// Analogue flows disagree too much: std_dev > max_cv * mean.
    LowConfidence { mean: f64, std_dev: f64, samples: usize },
}

impl std::fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnresolvedReason::NoLevelReading => write!(f, "no level reading at this timestamp"),
            UnresolvedReason::NoAnalogues { level } => {
                write!(f, "no analogous level states near {:.3}", level)
            }
            UnresolvedReason::LowConfidence { mean, std_dev, samples } => write!(
                f,
                "analogue flows too dispersed (mean {:.3}, std {:.3}, n={})",
                mean, std_dev, samples
            ),
        }
    }
}

/// Outcome of estimating one missing flow value.
#[derive(Debug, Clone, PartialEq)]
pub enum GapEstimate {
    Found(f64),
    Unresolved(UnresolvedReason),
}

/// A gap that survived a fill pass, with the reason it did.
#[derive(Debug, Clone, PartialEq)]
pub struct GapIssue {
    pub timestamp: NaiveDateTime,
    pub error: ImputationError,
}

/// Output of a fill pass: the series (unresolved gaps remain `None`) plus
/// one issue per gap that could not be filled.
#[derive(Debug, Clone, PartialEq)]
pub struct FillReport {
    pub series: Series,
    pub filled: usize,
    pub issues: Vec<GapIssue>,
}

impl FillReport {
    pub fn is_fully_resolved(&self) -> bool {
        self.issues.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by the imputation and analysis components.
///
/// The first four variants are per-point and end up in `FillReport::issues`;
/// the rest reject a whole call.
#[derive(Debug, Clone, PartialEq)]
pub enum ImputationError {
    /// The heuristic could not produce a confident estimate.
    UnresolvedGap(UnresolvedReason),
    /// Bracketing known points share a timestamp.
    DegenerateInterpolation { prior: NaiveDateTime, posterior: NaiveDateTime },
    /// A gap at the start or end of the series has no anchor on one side.
    BoundaryGap { prior: Option<NaiveDateTime>, posterior: Option<NaiveDateTime> },
    /// The monotonicity window holds fewer than two values.
    EmptyWindow { index: usize, horizon: usize, len: usize },
    UnsortedSeries(NaiveDateTime),
    DuplicateTimestamp(NaiveDateTime),
    /// A complete series was required but this timestamp has no value.
    MissingValue(NaiveDateTime),
    ParseError(String),
    InsufficientData(String),
}

impl std::fmt::Display for ImputationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImputationError::UnresolvedGap(reason) => write!(f, "Unresolved gap: {}", reason),
            ImputationError::DegenerateInterpolation { prior, posterior } => write!(
                f,
                "Degenerate interpolation: anchors {} and {} span no time",
                prior, posterior
            ),
            ImputationError::BoundaryGap { prior, posterior } => match (prior, posterior) {
                (None, _) => write!(f, "Boundary gap: no known value before this point"),
                (_, None) => write!(f, "Boundary gap: no known value after this point"),
                _ => write!(f, "Boundary gap"),
            },
            ImputationError::EmptyWindow { index, horizon, len } => write!(
                f,
                "Empty monotonicity window at index {} (horizon {}, series length {})",
                index, horizon, len
            ),
            ImputationError::UnsortedSeries(t) => write!(f, "Series not sorted at {}", t),
            ImputationError::DuplicateTimestamp(t) => write!(f, "Duplicate timestamp {}", t),
            ImputationError::MissingValue(t) => write!(f, "Missing value at {}", t),
            ImputationError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ImputationError::InsufficientData(msg) => write!(f, "Insufficient data: {}", msg),
        }
    }
}

impl std::error::Error for ImputationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 3, 1)
            .unwrap()
            .and_hms_opt(0, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_series_rejects_duplicates_and_disorder() {
        let dup = Series::new(vec![Point::known(at(1), 1.0), Point::known(at(1), 2.0)]);
        assert_eq!(dup, Err(ImputationError::DuplicateTimestamp(at(1))));

        let unsorted = Series::new(vec![Point::known(at(2), 1.0), Point::known(at(1), 2.0)]);
        assert_eq!(unsorted, Err(ImputationError::UnsortedSeries(at(1))));
    }

    #[test]
    fn test_value_at_distinguishes_gap_from_zero() {
        let series = Series::new(vec![
            Point::known(at(0), 0.0),
            Point::missing(at(1)),
        ])
        .unwrap();
        assert_eq!(series.value_at(at(0)), Some(0.0));
        assert_eq!(series.value_at(at(1)), None);
        assert_eq!(series.missing_count(), 1);
        assert_eq!(series.complete_values(), Err(ImputationError::MissingValue(at(1))));
    }

    #[test]
    fn test_quality_flag_conversion() {
        assert_eq!(Quality::try_from(1u8), Ok(Quality::Good));
        assert_eq!(Quality::try_from(0u8), Ok(Quality::Bad));
        assert!(Quality::try_from(2u8).is_err());
    }

    #[test]
    fn test_error_display_mentions_reason() {
        let err = ImputationError::UnresolvedGap(UnresolvedReason::NoLevelReading);
        assert!(err.to_string().contains("no level reading"));
    }
}
