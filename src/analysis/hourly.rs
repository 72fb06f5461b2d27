/// Hourly pumped volume and calendar predictors.
///
/// Flow rates are given per hour, so each sample contributes
/// `rate * dt / 3600` where `dt` is the seconds since the previous sample.
/// The very first sample has no predecessor and is assumed to cover
/// `FIRST_SAMPLE_SECS`, the usual logger interval.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use std::collections::BTreeMap;

use crate::imputation::{FlowImputation, HeuristicParams, impute_station};
use crate::model::{ImputationError, Reading, Series};

pub const FIRST_SAMPLE_SECS: f64 = 5.0;

/// Aggregated flow for one clock hour.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyFlow {
    pub hour: NaiveDateTime,
    pub volume: f64,
    pub covered_secs: f64,
    /// Samples with a value.
    pub samples: usize,
    /// False for hours inserted by range filling.
    pub observed: bool,
    /// False when the hour still holds unresolved gaps.
    pub complete: bool,
}

impl HourlyFlow {
    fn empty(hour: NaiveDateTime) -> Self {
        HourlyFlow {
            hour,
            volume: 0.0,
            covered_secs: 0.0,
            samples: 0,
            observed: false,
            complete: true,
        }
    }
}

pub fn floor_hour(t: NaiveDateTime) -> NaiveDateTime {
    t.date().and_time(NaiveTime::MIN) + Duration::hours(i64::from(t.hour()))
}

/// Sums volume per clock hour.
///
/// Gaps contribute no volume and mark their hour incomplete. With
/// `impute_range`, every hour between the first and the last is present;
/// hours without samples get zero volume and `observed = false`.
pub fn flow_by_hour(series: &Series, impute_range: bool) -> Vec<HourlyFlow> {
    let mut hours: BTreeMap<NaiveDateTime, HourlyFlow> = BTreeMap::new();
    let mut previous: Option<NaiveDateTime> = None;

    for point in series.points() {
        let dt = match previous {
            Some(prev) => (point.timestamp - prev).num_milliseconds() as f64 / 1000.0,
            None => FIRST_SAMPLE_SECS,
        };
        previous = Some(point.timestamp);

        let hour = floor_hour(point.timestamp);
        let entry = hours.entry(hour).or_insert_with(|| HourlyFlow {
            observed: true,
            ..HourlyFlow::empty(hour)
        });
        entry.covered_secs += dt;
        match point.value {
            Some(rate) => {
                entry.volume += rate * dt / 3600.0;
                entry.samples += 1;
            }
            None => entry.complete = false,
        }
    }

    if impute_range {
        if let (Some(&first), Some(&last)) = (hours.keys().next(), hours.keys().next_back()) {
            let mut hour = first;
            while hour < last {
                hours.entry(hour).or_insert_with(|| HourlyFlow::empty(hour));
                hour += Duration::hours(1);
            }
        }
    }

    hours.into_values().collect()
}

/// Imputes one station's flow and aggregates it by hour.
pub fn prepare_hourly_flow(
    flow: Vec<Reading>,
    level: Vec<Reading>,
    method: FlowImputation,
    params: &HeuristicParams,
    impute_range: bool,
) -> Result<Vec<HourlyFlow>, ImputationError> {
    let imputed = impute_station(flow, level, method, params)?;
    Ok(flow_by_hour(&imputed.flow.series, impute_range))
}

// ---------------------------------------------------------------------------
// Predictors
// ---------------------------------------------------------------------------

/// Design matrix with named columns, one row per hour.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Hour-of-day and month dummies, a holiday flag and a constant.
///
/// All 24 hour and 12 month columns are always present, whether or not
/// the input covers them.
pub fn predictor_features(hours: &[NaiveDateTime], holidays: &[NaiveDate]) -> FeatureMatrix {
    let mut columns: Vec<String> = (0..24).map(|h| format!("hour_{:02}", h)).collect();
    columns.extend((1..=12).map(|m| format!("month_{:02}", m)));
    columns.push("is_holiday".to_string());
    columns.push("constant".to_string());

    let rows = hours
        .iter()
        .map(|t| {
            let mut row = vec![0.0; columns.len()];
            row[t.hour() as usize] = 1.0;
            row[24 + t.month0() as usize] = 1.0;
            if holidays.contains(&t.date()) {
                row[36] = 1.0;
            }
            row[37] = 1.0;
            row
        })
        .collect();

    FeatureMatrix { columns, rows }
}

/// Easter Sunday (Gregorian), anonymous computus.
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Dutch public holidays of `year`, sorted.
pub fn netherlands_holidays(year: i32) -> Vec<NaiveDate> {
    let fixed = |month, day| NaiveDate::from_ymd_opt(year, month, day);
    let mut days: Vec<Option<NaiveDate>> = vec![fixed(1, 1), fixed(12, 25), fixed(12, 26)];

    if let Some(easter) = easter_sunday(year) {
        for offset in [0, 1, 39, 49, 50] {
            days.push(Some(easter + Duration::days(offset)));
        }
    }

    // King's Day since 2014, Queen's Day before. A Sunday moves to Saturday,
    // except for Queen's Day before 1980, which moved to Monday.
    let (royal, sunday_shift) = match year {
        2014.. => (fixed(4, 27), -1),
        1980..=2013 => (fixed(4, 30), -1),
        _ => (fixed(4, 30), 1),
    };
    let royal = royal.map(|d| match d.weekday() {
        Weekday::Sun => d + Duration::days(sunday_shift),
        _ => d,
    });
    days.push(royal);

    if year % 5 == 0 {
        days.push(fixed(5, 5));
    }

    let mut days: Vec<NaiveDate> = days.into_iter().flatten().collect();
    days.sort();
    days
}
