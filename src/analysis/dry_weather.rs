/// Dry-weather flow analysis.
///
/// Rain gauge records are reduced to one total per day (the mean over
/// catchment areas, summed over the day) and a dry-series counter: the
/// number of consecutive days since the last day whose total reached the
/// wet threshold. Days whose counter reaches `min_dry_series` are dry.
///
/// The dry-weather table compares the theoretical dry-weather flow (Q80,
/// the daily volume exceeded on 80% of dry days) with seasonal and weekly
/// means of dry-day volume.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::hourly::flow_by_hour;
use crate::model::Series;
use crate::stats::{mean, quantile};

/// One rain gauge interval with a value per catchment area.
#[derive(Debug, Clone, PartialEq)]
pub struct RainRecord {
    pub start: NaiveDateTime,
    pub area_values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyRain {
    pub date: NaiveDate,
    pub total: f64,
    pub dry_series: u32,
}

// ---------------------------------------------------------------------------
// Rain
// ---------------------------------------------------------------------------

pub fn summarize_rain(records: &[RainRecord], dry_threshold: f64) -> Vec<DailyRain> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in records {
        let total = totals.entry(record.start.date()).or_insert(0.0);
        if let Some(area_mean) = mean(&record.area_values) {
            *total += area_mean;
        }
    }

    let mut days: Vec<DailyRain> = Vec::with_capacity(totals.len());
    for (date, total) in totals {
        // History before the first day is unknown, so it starts the count.
        let dry_series = match days.last() {
            Some(prev) if total < dry_threshold => prev.dry_series + 1,
            _ => 0,
        };
        days.push(DailyRain { date, total, dry_series });
    }
    days
}

pub fn dry_days(summary: &[DailyRain], min_dry_series: u32) -> BTreeSet<NaiveDate> {
    summary
        .iter()
        .filter(|d| d.dry_series >= min_dry_series)
        .map(|d| d.date)
        .collect()
}

/// Keeps the points of `series` that fall on one of `days`.
pub fn restrict_to_days(series: &Series, days: &BTreeSet<NaiveDate>) -> Series {
    let points = series
        .points()
        .iter()
        .filter(|p| days.contains(&p.timestamp.date()))
        .copied()
        .collect();
    Series::from_sorted(points)
}

/// Pumped volume per calendar day.
pub fn daily_volumes(flow: &Series) -> BTreeMap<NaiveDate, f64> {
    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for hour in flow_by_hour(flow, false) {
        *daily.entry(hour.hour.date()).or_insert(0.0) += hour.volume;
    }
    daily
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DwfRow {
    pub name: &'static str,
    pub value: Option<f64>,
    /// `value / Q80`.
    pub relative: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DryWeatherTable {
    pub dry_days: usize,
    pub rows: Vec<DwfRow>,
}

impl DryWeatherTable {
    pub fn row(&self, name: &str) -> Option<&DwfRow> {
        self.rows.iter().find(|r| r.name == name)
    }
}

impl fmt::Display for DryWeatherTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{:<24} {:>12} {:>10}", "Measure", "Volume/day", "Relative")?;
        for row in &self.rows {
            let value = row.value.map_or("-".to_string(), |v| format!("{:.2}", v));
            let relative = row.relative.map_or("-".to_string(), |v| format!("{:.2}", v));
            writeln!(f, "{:<24} {:>12} {:>10}", row.name, value, relative)?;
        }
        write!(f, "({} dry days)", self.dry_days)
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Builds the table from daily volumes that are already restricted to dry
/// days. Rows with no matching days have no value.
pub fn dwf_table(daily: &BTreeMap<NaiveDate, f64>) -> DryWeatherTable {
    let select = |keep: &dyn Fn(NaiveDate) -> bool| -> Vec<f64> {
        daily
            .iter()
            .filter(|(date, _)| keep(**date))
            .map(|(_, volume)| *volume)
            .collect()
    };
    let all = select(&|_| true);
    let q80 = quantile(&all, 0.2);

    let measures = [
        ("Theoretical DWF (Q80)", q80),
        ("Winter", mean(&select(&|d| d.month() <= 3))),
        ("Summer", mean(&select(&|d| (6..=9).contains(&d.month())))),
        ("Workday", mean(&select(&|d| !is_weekend(d)))),
        ("Weekend", mean(&select(&is_weekend))),
        ("Average", mean(&all)),
    ];

    let rows = measures
        .into_iter()
        .map(|(name, value)| DwfRow {
            name,
            value,
            relative: match (value, q80) {
                (Some(v), Some(q)) if q != 0.0 => Some(v / q),
                _ => None,
            },
        })
        .collect();

    DryWeatherTable { dry_days: all.len(), rows }
}

/// Dry-weather table for a complete flow series and a rain summary.
///
/// Volumes are computed on the whole series before restricting to dry
/// days, so the first sample of a dry day keeps its true interval.
pub fn dry_weather_table(
    flow: &Series,
    summary: &[DailyRain],
    min_dry_series: u32,
) -> DryWeatherTable {
    let dry = dry_days(summary, min_dry_series);
    let daily: BTreeMap<NaiveDate, f64> = daily_volumes(flow)
        .into_iter()
        .filter(|(date, _)| dry.contains(date))
        .collect();
    dwf_table(&daily)
}
