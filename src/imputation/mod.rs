/// Gap filling for pump station flow and level series.
///
/// Submodules:
/// - `monotonicity` — sliding-window rising/falling/extremum labels.
/// - `level`        — time-weighted interpolation of level gaps.
/// - `flow`         — level-driven heuristic for flow gaps.
/// - `simple`       — carry-forward-or-zero flow fallback.
///
/// `impute_station` chains cleaning, alignment and both fillers for one
/// station. It is a pure function of its inputs, so independent stations
/// can be processed on separate threads.

pub mod flow;
pub mod level;
pub mod monotonicity;
pub mod simple;

use serde::Deserialize;

use crate::model::{AlignedPair, FillReport, ImputationError, Reading};
use crate::preprocess::{align, clean};

pub use flow::{FlowEstimator, fill_flow};
pub use level::fill_level;
pub use monotonicity::classify;
pub use simple::fill_flow_simple;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Tuning knobs for the heuristic flow filler.
///
/// The defaults were tuned on a single pump station; treat them as a
/// starting point for others.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HeuristicParams {
    /// Level tolerance when searching analogous states (sensor units).
    pub epsilon: f64,
    /// Differences allowed against the trend in a monotonicity window.
    pub beta: usize,
    /// Half-width of the monotonicity window, in readings.
    pub horizon: usize,
    /// Quantile of all level values used as the pump switch-on level.
    pub on_level_quantile: f64,
    /// Fixed switch-on level; overrides `on_level_quantile` when set.
    pub on_level: Option<f64>,
    /// Confidence gate: analogue flows with std > this * mean are rejected.
    pub max_coefficient_of_variation: f64,
}

impl Default for HeuristicParams {
    fn default() -> Self {
        Self {
            epsilon: 0.01,
            beta: 4,
            horizon: 5,
            on_level_quantile: 0.95,
            on_level: None,
            max_coefficient_of_variation: 0.5,
        }
    }
}

/// Which flow filler a pipeline should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowImputation {
    /// Carry forward isolated gaps, zero elsewhere.
    Simple,
    /// Level-driven heuristic; gaps may stay unresolved.
    Heuristic,
    /// Leave flow gaps as they are.
    None,
}

impl std::str::FromStr for FlowImputation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple" => Ok(FlowImputation::Simple),
            "heuristic" => Ok(FlowImputation::Heuristic),
            "none" => Ok(FlowImputation::None),
            other => Err(format!("unknown imputation method '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Station pipeline
// ---------------------------------------------------------------------------

/// Filled flow and level for one station on a shared timestamp index.
#[derive(Debug, Clone)]
pub struct StationImputation {
    /// Cleaned and aligned input, before filling.
    pub observed: AlignedPair,
    pub flow: FillReport,
    pub level: FillReport,
}

/// Cleans raw readings, aligns them and fills both series.
///
/// # Errors
/// Only from the heuristic filler when the level series is too short to
/// label (`EmptyWindow`).
pub fn impute_station(
    flow_readings: Vec<Reading>,
    level_readings: Vec<Reading>,
    method: FlowImputation,
    params: &HeuristicParams,
) -> Result<StationImputation, ImputationError> {
    let flow = clean(flow_readings);
    let level = clean(level_readings);
    let aligned = align(&flow, &level);

    let flow_report = match method {
        FlowImputation::Heuristic => fill_flow(&flow, &level, params)?,
        FlowImputation::Simple => {
            let filled = aligned.flow.missing_count();
            FillReport {
                series: fill_flow_simple(&aligned.flow),
                filled,
                issues: Vec::new(),
            }
        }
        FlowImputation::None => FillReport {
            series: aligned.flow.clone(),
            filled: 0,
            issues: Vec::new(),
        },
    };

    let level_report = fill_level(&aligned.level);
    Ok(StationImputation {
        observed: aligned,
        flow: flow_report,
        level: level_report,
    })
}
