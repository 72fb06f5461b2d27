/// Test fixtures: synthetic pump station series and JSON payloads.
///
/// The pump cycle fixture models a wet well sampled once a minute over
/// five 24-minute cycles:
///   phase 0..=16: pump off, level rises 0.05 per minute from 0.2 to 1.0
///   phase 17..=23: pump on, level falls 0.1 per minute from 0.9 to 0.3
///
/// The flow meter only writes while the pump runs (values 40-42), and
/// every fifth minute of pumping is dropped to create gaps the heuristic
/// has to fill from other cycles. Two level readings are flagged bad.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::model::{Quality, Reading};

pub(crate) const CYCLE_MINUTES: i64 = 24;
pub(crate) const CYCLES: i64 = 5;

pub(crate) fn fixture_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2019, 5, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub(crate) fn cycle_level(phase: i64) -> f64 {
    if phase <= 16 {
        0.2 + 0.05 * phase as f64
    } else {
        1.0 - 0.1 * (phase - 16) as f64
    }
}

/// Level readings, once a minute, minutes 7 and 55 flagged bad.
pub(crate) fn pump_cycle_level() -> Vec<Reading> {
    (0..CYCLE_MINUTES * CYCLES)
        .map(|m| Reading {
            timestamp: fixture_start() + Duration::minutes(m),
            value: Some(cycle_level(m % CYCLE_MINUTES)),
            quality: if m == 7 || m == 55 { Quality::Bad } else { Quality::Good },
        })
        .collect()
}

/// Flow readings while pumping, every fifth minute missing.
pub(crate) fn pump_cycle_flow() -> Vec<Reading> {
    (0..CYCLE_MINUTES * CYCLES)
        .filter(|m| m % CYCLE_MINUTES > 16 && m % 5 != 0)
        .map(|m| Reading {
            timestamp: fixture_start() + Duration::minutes(m),
            value: Some(40.0 + (m % 3) as f64),
            quality: Quality::Good,
        })
        .collect()
}

/// Four rows: plain value, explicit null, bad quality, quality omitted.
pub(crate) fn fixture_flow_json() -> &'static str {
    r#"[
      { "timestamp": "2019-05-01T00:00:00", "value": 41.5, "quality": 1 },
      { "timestamp": "2019-05-01 00:00:05", "value": null, "quality": 1 },
      { "timestamp": "2019-05-01T00:00:10.500", "value": 38.0, "quality": 0 },
      { "timestamp": "2019-05-01T00:00:15", "value": 0.0 }
    ]"#
}

/// Hourly rain over two catchment areas; one area missing in the last row.
pub(crate) fn fixture_rain_json() -> &'static str {
    r#"[
      { "start": "2019-05-01T00:00:00", "values": [0.0, 0.2] },
      { "start": "2019-05-01T01:00:00", "values": [1.0, 3.0] },
      { "start": "2019-05-02T00:00:00", "values": [null, 4.0] }
    ]"#
}
