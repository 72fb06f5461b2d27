/// Event segmentation for filled flow and level series.
///
/// `segment` tags every sample of a series with a group id so that the
/// calibration step can aggregate one pump event at a time:
///
/// - Flow: a group is a burst of non-zero flow. A new group starts at every
///   non-zero sample that directly follows a zero sample. Zero samples get
///   id 0. A burst already running at the first sample has no observed
///   start and is left at id 0 as well.
/// - Level: a group is a drawdown from a prominent local maximum to the next
///   prominent local minimum, inclusive. Samples outside any drawdown get
///   id 0. When drawdowns overlap the later one keeps the shared samples.
///
/// Ids start at 1 and increase in time order.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use super::peaks::{find_peaks, find_troughs};
use crate::model::{ImputationError, Series};

/// Default minimum prominence for level maxima/minima, in level units.
pub const DEFAULT_LEVEL_PROMINENCE: f64 = 0.5;

/// Which segmentation rule to apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroupKind {
    Flow,
    Level { min_prominence: f64 },
}

impl GroupKind {
    pub fn level() -> Self {
        GroupKind::Level { min_prominence: DEFAULT_LEVEL_PROMINENCE }
    }
}

/// A complete series with one group id per sample (0 = ungrouped).
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedSeries {
    pub timestamps: Vec<NaiveDateTime>,
    pub values: Vec<f64>,
    pub group_ids: Vec<u32>,
}

impl GroupedSeries {
    pub fn len(&self) -> usize {
        self.group_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.group_ids.is_empty()
    }

    /// Number of distinct non-zero groups.
    pub fn group_count(&self) -> usize {
        self.by_group().len()
    }

    /// Sample indices per non-zero group id, in time order.
    pub fn by_group(&self) -> BTreeMap<u32, Vec<usize>> {
        let mut grouped: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (i, &id) in self.group_ids.iter().enumerate() {
            if id != 0 {
                grouped.entry(id).or_default().push(i);
            }
        }
        grouped
    }
}

// ---------------------------------------------------------------------------
// Segmentation
// ---------------------------------------------------------------------------

/// Tags `series` with group ids.
///
/// # Errors
/// `ImputationError::MissingValue` if the series still has gaps.
pub fn segment(series: &Series, kind: GroupKind) -> Result<GroupedSeries, ImputationError> {
    let values = series.complete_values()?;
    let group_ids = match kind {
        GroupKind::Flow => flow_group_ids(&values),
        GroupKind::Level { min_prominence } => level_group_ids(&values, min_prominence),
    };
    Ok(GroupedSeries {
        timestamps: series.timestamps().collect(),
        values,
        group_ids,
    })
}

pub fn flow_group_ids(values: &[f64]) -> Vec<u32> {
    let mut current = 0;
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if v == 0.0 {
                return 0;
            }
            if i > 0 && values[i - 1] == 0.0 {
                current += 1;
            }
            current
        })
        .collect()
}

pub fn level_group_ids(values: &[f64], min_prominence: f64) -> Vec<u32> {
    let mut ids = vec![0; values.len()];
    let maxima = find_peaks(values, min_prominence);
    let minima = find_troughs(values, min_prominence);

    let mut current = 0;
    for peak in maxima {
        let next_min = minima.partition_point(|&m| m <= peak);
        let Some(&trough) = minima.get(next_min) else {
            continue;
        };
        current += 1;
        ids[peak..=trough].fill(current);
    }
    ids
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
