/// JSON tabular interchange for sensor series.
///
/// Upstream loaders hand over already-exported sensor tables as JSON arrays:
///
/// ```text
/// [
///   { "timestamp": "2019-05-01T00:00:00", "value": 0.42, "quality": 1 },
///   { "timestamp": "2019-05-01 00:00:05", "value": null, "quality": 1 }
/// ]
/// ```
///
/// `quality` defaults to 1 when omitted. Timestamps are naive local times,
/// with either a `T` or a space between date and time.
///
/// Output rows mirror the input shape and add a `status` column so that
/// consumers can tell observed, imputed and unresolved values apart.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::analysis::dry_weather::RainRecord;
use crate::model::{FillReport, ImputationError, Quality, Reading, Series};

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Timestamp format used for all output rows.
pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ---------------------------------------------------------------------------
// Serde structures
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ReadingRow {
    timestamp: String,
    value: Option<f64>,
    #[serde(default = "default_quality")]
    quality: Quality,
}

fn default_quality() -> Quality {
    Quality::Good
}

#[derive(Deserialize)]
struct RainRow {
    start: String,
    values: Vec<Option<f64>>,
}

/// Status of one output value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueStatus {
    Observed,
    Imputed,
    Unresolved,
}

/// One row of an imputed series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRow {
    pub timestamp: String,
    pub value: Option<f64>,
    pub status: ValueStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, ImputationError> {
    let trimmed = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| ImputationError::ParseError(format!("unrecognised timestamp '{}'", raw)))
}

/// Parses a JSON array of sensor rows into raw readings (unsorted, uncleaned).
///
/// # Errors
/// `ImputationError::ParseError` for malformed JSON, unknown quality flags or
/// unparseable timestamps.
pub fn parse_readings(json: &str) -> Result<Vec<Reading>, ImputationError> {
    let rows: Vec<ReadingRow> = serde_json::from_str(json)
        .map_err(|e| ImputationError::ParseError(format!("JSON deserialization failed: {}", e)))?;

    rows.into_iter()
        .map(|row| {
            Ok(Reading {
                timestamp: parse_timestamp(&row.timestamp)?,
                value: row.value.filter(|v| v.is_finite()),
                quality: row.quality,
            })
        })
        .collect()
}

/// Parses rain gauge rows: one start time plus one value per catchment area.
/// Null area values are skipped when averaging.
pub fn parse_rain(json: &str) -> Result<Vec<RainRecord>, ImputationError> {
    let rows: Vec<RainRow> = serde_json::from_str(json)
        .map_err(|e| ImputationError::ParseError(format!("JSON deserialization failed: {}", e)))?;

    rows.into_iter()
        .map(|row| {
            Ok(RainRecord {
                start: parse_timestamp(&row.start)?,
                area_values: row.values.into_iter().flatten().collect(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Builds output rows for a filled series.
///
/// `observed` is the series before filling; a value present there is
/// reported as observed, a value that only exists after filling as imputed.
/// Points still missing are unresolved, with a reason when the filler
/// recorded one.
pub fn to_rows(observed: &Series, report: &FillReport) -> Vec<OutputRow> {
    let unresolved: HashSet<NaiveDateTime> =
        report.issues.iter().map(|issue| issue.timestamp).collect();
    let mut reasons = report.issues.iter();

    report
        .series
        .points()
        .iter()
        .map(|p| {
            let (status, reason) = if unresolved.contains(&p.timestamp) {
                // Issues are recorded in index order.
                let reason = reasons.next().map(|issue| issue.error.to_string());
                (ValueStatus::Unresolved, reason)
            } else if p.value.is_none() {
                (ValueStatus::Unresolved, None)
            } else if observed.value_at(p.timestamp).is_some() {
                (ValueStatus::Observed, None)
            } else {
                (ValueStatus::Imputed, None)
            };
            OutputRow {
                timestamp: p.timestamp.format(OUTPUT_TIMESTAMP_FORMAT).to_string(),
                value: p.value,
                status,
                reason,
            }
        })
        .collect()
}

pub fn render_rows(rows: &[OutputRow]) -> Result<String, ImputationError> {
    serde_json::to_string_pretty(rows)
        .map_err(|e| ImputationError::ParseError(format!("JSON serialization failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::*;
    use crate::model::{GapIssue, Point, UnresolvedReason};
    use chrono::NaiveDate;

    #[test]
    fn test_parse_readings_handles_nulls_quality_and_formats() {
        let readings = parse_readings(fixture_flow_json()).expect("fixture should parse");
        assert_eq!(readings.len(), 4);
        assert_eq!(readings[0].value, Some(41.5));
        assert_eq!(readings[1].value, None);
        assert_eq!(readings[2].quality, Quality::Bad);
        // Quality omitted → good.
        assert_eq!(readings[3].quality, Quality::Good);
        assert_eq!(
            readings[1].timestamp,
            NaiveDate::from_ymd_opt(2019, 5, 1).unwrap().and_hms_opt(0, 0, 5).unwrap()
        );
    }

    #[test]
    fn test_parse_readings_rejects_bad_input() {
        assert!(matches!(parse_readings("not json"), Err(ImputationError::ParseError(_))));
        assert!(parse_readings(r#"[{"timestamp": "yesterday", "value": 1.0}]"#).is_err());
        assert!(
            parse_readings(r#"[{"timestamp": "2019-05-01T00:00:00", "value": 1.0, "quality": 7}]"#)
                .is_err()
        );
    }

    #[test]
    fn test_parse_rain_skips_null_areas() {
        let records = parse_rain(fixture_rain_json()).expect("fixture should parse");
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].area_values, vec![0.0, 0.2]);
        assert_eq!(records[2].area_values, vec![4.0]);
    }

    #[test]
    fn test_rows_label_observed_imputed_and_unresolved() {
        let t = |m| NaiveDate::from_ymd_opt(2019, 5, 1).unwrap().and_hms_opt(0, m, 0).unwrap();
        let observed = Series::new(vec![Point::known(t(0), 3.0)]).unwrap();
        let report = FillReport {
            series: Series::new(vec![
                Point::known(t(0), 3.0),
                Point::known(t(1), 0.0),
                Point::missing(t(2)),
            ])
            .unwrap(),
            filled: 1,
            issues: vec![GapIssue {
                timestamp: t(2),
                error: ImputationError::UnresolvedGap(UnresolvedReason::NoLevelReading),
            }],
        };
        let rows = to_rows(&observed, &report);
        let statuses: Vec<_> = rows.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![ValueStatus::Observed, ValueStatus::Imputed, ValueStatus::Unresolved]
        );
        assert_eq!(rows[0].timestamp, "2019-05-01T00:00:00");
        assert!(rows[2].reason.as_deref().unwrap().contains("no level reading"));

        let json = render_rows(&rows).unwrap();
        assert!(json.contains("\"unresolved\""));
        assert!(!json.contains("\"reason\": null"));
    }
}
