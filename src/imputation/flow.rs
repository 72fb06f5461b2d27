/// Heuristic flow gap-filler driven by the pump station's level signal.
///
/// Pumps run in on/off cycles: the wet-well level rises while the pump is
/// off and falls while it discharges. For a missing flow value at time `t`:
///
/// 1. No level reading at `t` → unresolved.
/// 2. Level rising and below the switch-on level → the pump is off, flow 0.
/// 3. Otherwise look up every non-rising level reading within `epsilon` of
///    the level at `t` and take the flow recorded there. No such readings, or
///    analogue flows too dispersed (`std > max_cv * mean`) → unresolved;
///    else the mean analogue flow.
///
/// Unresolved gaps stay `None` in the output and are listed in the report.
/// They are never coerced to zero here.

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use super::HeuristicParams;
use super::monotonicity::classify;
use crate::model::{
    FillReport, GapEstimate, GapIssue, ImputationError, MonotonicityLabel, Point, Series,
    UnresolvedReason,
};
use crate::preprocess::align;
use crate::stats;

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

/// Labelled level history plus a value-sorted index of analogue flows.
#[derive(Debug, Clone)]
pub struct FlowEstimator {
    levels: Vec<(NaiveDateTime, f64, MonotonicityLabel)>,
    /// (level value, flow value) for non-rising level readings with flow,
    /// sorted by level value.
    analogues: Vec<(f64, f64)>,
    on_level: f64,
    epsilon: f64,
    max_cv: f64,
}

impl FlowEstimator {
    /// Labels `level`, derives the switch-on level and indexes analogue flows.
    ///
    /// # Errors
    /// `EmptyWindow` when the level series has fewer than two known values.
    pub fn new(
        flow: &Series,
        level: &Series,
        params: &HeuristicParams,
    ) -> Result<Self, ImputationError> {
        let known: Vec<(NaiveDateTime, f64)> = level.known().collect();
        let values: Vec<f64> = known.iter().map(|&(_, v)| v).collect();
        let labels = classify(&values, params.horizon, params.beta)?;

        let on_level = match params.on_level {
            Some(fixed) => fixed,
            None => stats::quantile(&values, params.on_level_quantile).ok_or_else(|| {
                ImputationError::InsufficientData("no level values for on-level".to_string())
            })?,
        };

        let levels: Vec<_> = known
            .iter()
            .zip(&labels)
            .map(|(&(t, v), &label)| (t, v, label))
            .collect();

        let mut analogues: Vec<(f64, f64)> = levels
            .iter()
            .filter(|(_, _, label)| *label != MonotonicityLabel::Rising)
            .filter_map(|&(t, v, _)| flow.value_at(t).map(|f| (v, f)))
            .collect();
        analogues.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(FlowEstimator {
            levels,
            analogues,
            on_level,
            epsilon: params.epsilon,
            max_cv: params.max_coefficient_of_variation,
        })
    }

    pub fn on_level(&self) -> f64 {
        self.on_level
    }

    /// Labelled level readings in time order.
    pub fn labels(&self) -> &[(NaiveDateTime, f64, MonotonicityLabel)] {
        &self.levels
    }

    /// Estimates flow for a level state.
    pub fn estimate(&self, level: f64, label: MonotonicityLabel) -> GapEstimate {
        if label == MonotonicityLabel::Rising && level < self.on_level {
            return GapEstimate::Found(0.0);
        }

        let flows = self.analogue_flows(level);
        let (Some(mean), Some(std_dev)) = (stats::mean(&flows), stats::population_std(&flows))
        else {
            return GapEstimate::Unresolved(UnresolvedReason::NoAnalogues { level });
        };

        if std_dev > self.max_cv * mean {
            return GapEstimate::Unresolved(UnresolvedReason::LowConfidence {
                mean,
                std_dev,
                samples: flows.len(),
            });
        }
        GapEstimate::Found(mean)
    }

    /// Flows recorded at non-rising level readings strictly within epsilon.
    fn analogue_flows(&self, level: f64) -> Vec<f64> {
        let lo = self.analogues.partition_point(|&(l, _)| l < level - self.epsilon);
        let hi = self.analogues.partition_point(|&(l, _)| l <= level + self.epsilon);
        self.analogues[lo..hi]
            .iter()
            .filter(|(l, _)| (l - level).abs() < self.epsilon)
            .map(|&(_, f)| f)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Fill pass
// ---------------------------------------------------------------------------

/// Fills flow gaps over the union of flow and level timestamps.
///
/// The output index is the aligned index: every level timestamp without a
/// flow reading is treated as a gap to estimate.
///
/// # Errors
/// Only whole-run failures: `EmptyWindow` for a level series too short to
/// label. Per-gap failures are in `FillReport::issues`.
pub fn fill_flow(
    flow: &Series,
    level: &Series,
    params: &HeuristicParams,
) -> Result<FillReport, ImputationError> {
    let estimator = FlowEstimator::new(flow, level, params)?;
    let aligned = align(flow, level);

    let mut out = Vec::with_capacity(aligned.len());
    let mut issues = Vec::new();
    let mut filled = 0;
    let mut inferred_off = 0;
    // Aligned level values appear in the same order as the labelled readings.
    let mut labelled = estimator.labels().iter();

    for (f, l) in aligned.flow.points().iter().zip(aligned.level.points()) {
        let level_state = match l.value {
            Some(_) => labelled.next().map(|&(_, v, label)| (v, label)),
            None => None,
        };

        if f.value.is_some() {
            out.push(*f);
            continue;
        }

        let estimate = match level_state {
            Some((value, label)) => estimator.estimate(value, label),
            None => GapEstimate::Unresolved(UnresolvedReason::NoLevelReading),
        };

        match estimate {
            GapEstimate::Found(value) => {
                if value == 0.0 {
                    inferred_off += 1;
                }
                out.push(Point::known(f.timestamp, value));
                filled += 1;
            }
            GapEstimate::Unresolved(reason) => {
                debug!(timestamp = %f.timestamp, %reason, "flow gap unresolved");
                out.push(*f);
                issues.push(GapIssue {
                    timestamp: f.timestamp,
                    error: ImputationError::UnresolvedGap(reason),
                });
            }
        }
    }

    let gaps = filled + issues.len();
    info!(
        gaps,
        resolved = filled,
        pump_off = inferred_off,
        unresolved = issues.len(),
        on_level = estimator.on_level(),
        "heuristic flow fill complete"
    );
    if issues.len() * 2 > gaps {
        warn!(
            unresolved = issues.len(),
            gaps, "more than half of the flow gaps could not be estimated"
        );
    }

    Ok(FillReport { series: Series::from_sorted(out), filled, issues })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 6, 3)
            .unwrap()
            .and_hms_opt(10, minute, 0)
            .unwrap()
    }

    /// Falling level with three readings within 0.01 of 0.5 that carry flow
    /// and one reading at exactly 0.5 whose flow is missing.
    fn drawdown(flows: [f64; 3]) -> (Series, Series) {
        let levels = [0.9, 0.8, 0.7, 0.6, 0.505, 0.502, 0.5, 0.495, 0.4, 0.3, 0.2, 0.1];
        let level = Series::from_values(
            &levels.iter().enumerate().map(|(i, &v)| (at(i as u32), v)).collect::<Vec<_>>(),
        )
        .unwrap();
        let flow =
            Series::from_values(&[(at(4), flows[0]), (at(5), flows[1]), (at(7), flows[2])]).unwrap();
        (flow, level)
    }

    #[test]
    fn test_rising_below_on_level_fills_zero() {
        let level = Series::from_values(&[(at(0), 0.2), (at(1), 0.4), (at(2), 0.6)]).unwrap();
        let flow = Series::default();
        let params = HeuristicParams { on_level: Some(0.9), ..HeuristicParams::default() };

        let report = fill_flow(&flow, &level, &params).unwrap();
        assert!(report.is_fully_resolved());
        assert_eq!(report.series.complete_values().unwrap(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_consistent_analogues_give_mean_flow() {
        let (flow, level) = drawdown([10.0, 11.0, 9.0]);
        let report = fill_flow(&flow, &level, &HeuristicParams::default()).unwrap();
        let value = report.series.value_at(at(6)).expect("gap at 0.5 should resolve");
        assert!((value - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_dispersed_analogues_stay_unresolved() {
        let (flow, level) = drawdown([10.0, 50.0, 2.0]);
        let report = fill_flow(&flow, &level, &HeuristicParams::default()).unwrap();

        assert_eq!(report.series.value_at(at(6)), None);
        let issue = report
            .issues
            .iter()
            .find(|i| i.timestamp == at(6))
            .expect("gap at 0.5 should be reported");
        assert!(matches!(
            issue.error,
            ImputationError::UnresolvedGap(UnresolvedReason::LowConfidence { samples: 3, .. })
        ));
    }

    #[test]
    fn test_no_analogues_is_unresolved_not_zero() {
        let (flow, level) = drawdown([10.0, 11.0, 9.0]);
        let report = fill_flow(&flow, &level, &HeuristicParams::default()).unwrap();
        // 0.9 is falling and nothing near it has flow.
        assert_eq!(report.series.value_at(at(0)), None);
        assert!(report.issues.iter().any(|i| i.timestamp == at(0)
            && matches!(
                i.error,
                ImputationError::UnresolvedGap(UnresolvedReason::NoAnalogues { .. })
            )));
    }

    #[test]
    fn test_flow_without_level_reading_is_unresolved() {
        let level = Series::from_values(&[(at(0), 0.2), (at(1), 0.3), (at(2), 0.4)]).unwrap();
        let flow = Series::new(vec![Point::known(at(0), 0.0), Point::missing(at(5))]).unwrap();
        let report = fill_flow(&flow, &level, &HeuristicParams::default()).unwrap();
        let issue = report.issues.iter().find(|i| i.timestamp == at(5)).unwrap();
        assert_eq!(
            issue.error,
            ImputationError::UnresolvedGap(UnresolvedReason::NoLevelReading)
        );
    }

    #[test]
    fn test_present_flow_values_pass_through_in_order() {
        let (flow, level) = drawdown([10.0, 11.0, 9.0]);
        let report = fill_flow(&flow, &level, &HeuristicParams::default()).unwrap();
        assert_eq!(report.series.len(), level.len());
        for (t, v) in flow.known() {
            assert_eq!(report.series.value_at(t), Some(v));
        }
        assert!(report.series.timestamps().eq(level.timestamps()));
    }

    #[test]
    fn test_rising_above_on_level_searches_analogues() {
        let estimator_params = HeuristicParams { on_level: Some(0.45), ..Default::default() };
        let (flow, level) = drawdown([10.0, 11.0, 9.0]);
        let estimator = FlowEstimator::new(&flow, &level, &estimator_params).unwrap();
        assert_eq!(
            estimator.estimate(0.5, MonotonicityLabel::Rising),
            GapEstimate::Found(10.0)
        );
        assert_eq!(
            estimator.estimate(0.3, MonotonicityLabel::Rising),
            GapEstimate::Found(0.0)
        );
    }

    #[test]
    fn test_short_level_series_fails_whole_run() {
        let level = Series::from_values(&[(at(0), 0.2)]).unwrap();
        let result = fill_flow(&Series::default(), &level, &HeuristicParams::default());
        assert!(matches!(result, Err(ImputationError::EmptyWindow { .. })));
    }
}
