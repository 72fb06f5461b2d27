/// Flow/level coefficient estimation from segmented pump events.
///
/// Each flow burst (one pump run) is paired with the level drawdown that
/// starts closest to it in time. The drawdown's level change is corrected
/// for inflow during the run: the rise rate observed before the drawdown is
/// assumed to continue while the pump runs, so
///
/// ```text
/// adjusted_delta = delta - prior_increase / prior_increase_secs * run_secs
/// ```
///
/// Regressing pumped volume on `adjusted_delta` gives the wet-well
/// conversion coefficient (volume per unit of level) as the slope.
///
/// # Analysis Process
///
/// 1. Clean and align flow/level, simple-fill flow, interpolate level.
/// 2. Segment flow into bursts and level into drawdowns.
/// 3. Summarize drawdowns, then flow events with their matched drawdown.
/// 4. Fit `volume ~ 1 + adjusted_delta` by ordinary least squares.

use chrono::NaiveDateTime;

use super::groupings::{GroupKind, GroupedSeries, segment};
use crate::imputation::{fill_flow_simple, fill_level};
use crate::model::{ImputationError, Reading, Series};
use crate::preprocess::{align, clean};

// ---------------------------------------------------------------------------
// Summary types
// ---------------------------------------------------------------------------

/// One level drawdown (pump run seen from the wet well).
#[derive(Debug, Clone, PartialEq)]
pub struct LevelDrop {
    pub group: u32,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// min − max over the drawdown, never positive.
    pub delta: f64,
    pub time_span_secs: f64,
    /// This drawdown's max minus the previous drawdown's min.
    pub prior_increase: Option<f64>,
    /// Seconds from the previous drawdown's end to this one's start.
    pub prior_increase_secs: Option<f64>,
    pub max_level: f64,
}

/// One flow burst with its matched drawdown.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowEvent {
    pub group: u32,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Pumped volume: sum of `rate * dt / 3600` over the burst.
    pub volume: f64,
    pub time_span_secs: f64,
    pub drop: Option<LevelDrop>,
    pub adjusted_delta: Option<f64>,
}

/// Result of `volume ~ 1 + adjusted_delta`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientFit {
    pub intercept: f64,
    pub slope: f64,
    pub r_squared: f64,
    pub samples: usize,
}

// ---------------------------------------------------------------------------
// Volumes and summaries
// ---------------------------------------------------------------------------

/// Per-sample volume for a rate series given per hour: `rate * dt / 3600`,
/// where `dt` is the seconds since the previous sample (0 for the first).
pub fn sample_volumes(timestamps: &[NaiveDateTime], rates: &[f64]) -> Vec<f64> {
    timestamps
        .iter()
        .zip(rates)
        .enumerate()
        .map(|(i, (t, rate))| {
            let dt = match i {
                0 => 0.0,
                _ => seconds_between(timestamps[i - 1], *t),
            };
            rate * dt / 3600.0
        })
        .collect()
}

pub fn summarize_level_drops(level: &GroupedSeries) -> Vec<LevelDrop> {
    let mut drops: Vec<LevelDrop> = Vec::new();
    let mut previous: Option<(f64, NaiveDateTime)> = None;

    for (group, indices) in level.by_group() {
        let (Some(&first), Some(&last)) = (indices.first(), indices.last()) else {
            continue;
        };
        let members = indices.iter().map(|&i| level.values[i]);
        let max_level = members.clone().fold(f64::NEG_INFINITY, f64::max);
        let min_level = members.fold(f64::INFINITY, f64::min);
        let start = level.timestamps[first];
        let end = level.timestamps[last];

        drops.push(LevelDrop {
            group,
            start,
            end,
            delta: min_level - max_level,
            time_span_secs: seconds_between(start, end),
            prior_increase: previous.map(|(prev_min, _)| max_level - prev_min),
            prior_increase_secs: previous.map(|(_, prev_end)| seconds_between(prev_end, start)),
            max_level,
        });
        previous = Some((min_level, end));
    }
    drops
}

pub fn summarize_flow_events(flow: &GroupedSeries, drops: &[LevelDrop]) -> Vec<FlowEvent> {
    let volumes = sample_volumes(&flow.timestamps, &flow.values);

    flow.by_group()
        .into_iter()
        .filter_map(|(group, indices)| {
            let start = flow.timestamps[*indices.first()?];
            let end = flow.timestamps[*indices.last()?];
            let time_span_secs = seconds_between(start, end);
            let drop = nearest_drop(drops, start).cloned();
            let adjusted_delta = drop.as_ref().and_then(|d| adjusted_delta(d, time_span_secs));

            Some(FlowEvent {
                group,
                start,
                end,
                volume: indices.iter().map(|&i| volumes[i]).sum(),
                time_span_secs,
                drop,
                adjusted_delta,
            })
        })
        .collect()
}

fn nearest_drop(drops: &[LevelDrop], start: NaiveDateTime) -> Option<&LevelDrop> {
    drops
        .iter()
        .min_by_key(|d| (d.start - start).num_milliseconds().abs())
}

fn adjusted_delta(drop: &LevelDrop, run_secs: f64) -> Option<f64> {
    let increase = drop.prior_increase?;
    let secs = drop.prior_increase_secs?;
    if secs <= 0.0 {
        return None;
    }
    Some(drop.delta - increase / secs * run_secs)
}

fn seconds_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

// ---------------------------------------------------------------------------
// Fit
// ---------------------------------------------------------------------------

/// Ordinary least squares of event volume on adjusted level change.
///
/// # Errors
/// `InsufficientData` with fewer than two events carrying an adjusted delta,
/// or when all adjusted deltas are equal.
pub fn fit_coefficient(events: &[FlowEvent]) -> Result<CoefficientFit, ImputationError> {
    let points: Vec<(f64, f64)> = events
        .iter()
        .filter_map(|e| e.adjusted_delta.map(|x| (x, e.volume)))
        .collect();
    let n = points.len();
    if n < 2 {
        return Err(ImputationError::InsufficientData(format!(
            "{} usable pump events, need at least 2",
            n
        )));
    }

    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n as f64;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n as f64;
    let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    let sxy: f64 = points.iter().map(|p| (p.0 - mean_x) * (p.1 - mean_y)).sum();
    if sxx == 0.0 {
        return Err(ImputationError::InsufficientData(
            "adjusted level change has no variance".to_string(),
        ));
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let ss_tot: f64 = points.iter().map(|p| (p.1 - mean_y).powi(2)).sum();
    let ss_res: f64 = points
        .iter()
        .map(|p| (p.1 - (intercept + slope * p.0)).powi(2))
        .sum();
    let r_squared = if ss_tot == 0.0 { 1.0 } else { 1.0 - ss_res / ss_tot };

    Ok(CoefficientFit { intercept, slope, r_squared, samples: n })
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Cleans, aligns and fills raw readings for calibration.
///
/// Flow uses the simple filler so bursts are complete; level gaps are
/// interpolated and boundary gaps dropped.
pub fn prepare_series(flow: Vec<Reading>, level: Vec<Reading>) -> (Series, Series) {
    let aligned = align(&clean(flow), &clean(level));
    let flow = fill_flow_simple(&aligned.flow);
    let level = fill_level(&aligned.level).series.known_only();
    (flow, level)
}

/// Segmented events of one station, ready for fitting.
#[derive(Debug, Clone)]
pub struct Calibration {
    pub flow: GroupedSeries,
    pub level: GroupedSeries,
    pub drops: Vec<LevelDrop>,
    pub events: Vec<FlowEvent>,
}

impl Calibration {
    /// Segments complete flow and level series and summarizes events.
    pub fn from_series(
        flow: &Series,
        level: &Series,
        level_prominence: f64,
    ) -> Result<Self, ImputationError> {
        let flow = segment(flow, GroupKind::Flow)?;
        let level = segment(level, GroupKind::Level { min_prominence: level_prominence })?;
        let drops = summarize_level_drops(&level);
        let events = summarize_flow_events(&flow, &drops);
        Ok(Calibration { flow, level, drops, events })
    }

    pub fn from_readings(
        flow: Vec<Reading>,
        level: Vec<Reading>,
        level_prominence: f64,
    ) -> Result<Self, ImputationError> {
        let (flow, level) = prepare_series(flow, level);
        Calibration::from_series(&flow, &level, level_prominence)
    }

    pub fn fit(&self) -> Result<CoefficientFit, ImputationError> {
        fit_coefficient(&self.events)
    }
}
