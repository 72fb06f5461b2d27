/// Reading cleanup and flow/level alignment.
///
/// Flow meters at small pump stations often write nothing at all while the
/// pump is off. Merging flow and level naively therefore drops exactly the
/// zero-flow periods. `align` re-indexes both series onto the union of
/// their timestamps so that silence shows up as an explicit gap that a
/// filler can deal with later.

use crate::model::{AlignedPair, Point, Quality, Reading, Series};

// ---------------------------------------------------------------------------
// Cleaning
// ---------------------------------------------------------------------------

/// Sorts readings, keeps the first of each duplicated timestamp, then drops
/// bad-quality readings.
///
/// Deduplication happens before the quality filter: a duplicate whose first
/// copy is bad removes the timestamp entirely.
pub fn clean(mut readings: Vec<Reading>) -> Series {
    // Stable sort keeps export order among duplicates.
    readings.sort_by_key(|r| r.timestamp);
    readings.dedup_by_key(|r| r.timestamp);

    let points = readings
        .into_iter()
        .filter(|r| r.quality == Quality::Good)
        .map(|r| Point { timestamp: r.timestamp, value: r.value })
        .collect();

    Series::from_sorted(points)
}

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

/// Re-indexes flow and level onto the sorted union of their timestamps.
///
/// A timestamp present in only one input becomes a gap in the other.
/// Existing values, including existing gaps, are carried over unchanged.
pub fn align(flow: &Series, level: &Series) -> AlignedPair {
    let a = flow.points();
    let b = level.points();
    let capacity = a.len().max(b.len());
    let mut flow_out = Vec::with_capacity(capacity);
    let mut level_out = Vec::with_capacity(capacity);

    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        match (a.get(i), b.get(j)) {
            (Some(f), Some(l)) if f.timestamp == l.timestamp => {
                flow_out.push(*f);
                level_out.push(*l);
                i += 1;
                j += 1;
            }
            (Some(f), Some(l)) if f.timestamp < l.timestamp => {
                flow_out.push(*f);
                level_out.push(Point::missing(f.timestamp));
                i += 1;
            }
            (Some(f), None) => {
                flow_out.push(*f);
                level_out.push(Point::missing(f.timestamp));
                i += 1;
            }
            (_, Some(l)) => {
                flow_out.push(Point::missing(l.timestamp));
                level_out.push(*l);
                j += 1;
            }
            (None, None) => break,
        }
    }

    AlignedPair {
        flow: Series::from_sorted(flow_out),
        level: Series::from_sorted(level_out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::collections::BTreeSet;

    fn at(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2018, 7, 2)
            .unwrap()
            .and_hms_opt(6, minute, 0)
            .unwrap()
    }

    fn reading(minute: u32, value: f64, quality: Quality) -> Reading {
        Reading { timestamp: at(minute), value: Some(value), quality }
    }

    // --- Cleaning -----------------------------------------------------------

    #[test]
    fn test_clean_sorts_dedups_and_filters_quality() {
        let readings = vec![
            reading(3, 3.0, Quality::Good),
            reading(1, 1.0, Quality::Good),
            reading(1, 9.0, Quality::Good),
            reading(2, 2.0, Quality::Bad),
        ];
        let series = clean(readings);
        let values: Vec<_> = series.known().collect();
        assert_eq!(values, vec![(at(1), 1.0), (at(3), 3.0)]);
    }

    #[test]
    fn test_clean_drops_timestamp_when_first_duplicate_is_bad() {
        let readings = vec![reading(1, 1.0, Quality::Bad), reading(1, 2.0, Quality::Good)];
        assert!(clean(readings).is_empty());
    }

    #[test]
    fn test_clean_keeps_explicit_missing_values() {
        let readings = vec![Reading { timestamp: at(0), value: None, quality: Quality::Good }];
        let series = clean(readings);
        assert_eq!(series.len(), 1);
        assert_eq!(series.missing_count(), 1);
    }

    // --- Alignment ----------------------------------------------------------

    #[test]
    fn test_align_index_is_union_of_timestamps() {
        let flow = Series::from_values(&[(at(0), 5.0), (at(2), 6.0), (at(4), 7.0)]).unwrap();
        let level = Series::from_values(&[(at(1), 0.3), (at(2), 0.4), (at(5), 0.5)]).unwrap();
        let aligned = align(&flow, &level);

        let union: BTreeSet<_> = flow.timestamps().chain(level.timestamps()).collect();
        assert_eq!(aligned.len(), union.len());
        assert!(aligned.flow.timestamps().eq(aligned.level.timestamps()));
        assert!(aligned.timestamps().eq(union.into_iter()));
    }

    #[test]
    fn test_align_preserves_original_values_and_marks_absence() {
        let flow = Series::from_values(&[(at(0), 0.0), (at(3), 12.5)]).unwrap();
        let level = Series::from_values(&[(at(0), 0.8), (at(1), 0.7)]).unwrap();
        let aligned = align(&flow, &level);

        for (t, v) in flow.known() {
            assert_eq!(aligned.flow.value_at(t), Some(v));
        }
        for (t, v) in level.known() {
            assert_eq!(aligned.level.value_at(t), Some(v));
        }
        // A measured zero stays zero; silence at minute 1 is a gap.
        assert_eq!(aligned.flow.value_at(at(0)), Some(0.0));
        assert_eq!(aligned.flow.points()[1].value, None);
        assert_eq!(aligned.level.points()[2].value, None);
    }

    #[test]
    fn test_align_with_empty_side() {
        let flow = Series::default();
        let level = Series::from_values(&[(at(0), 0.1), (at(1), 0.2)]).unwrap();
        let aligned = align(&flow, &level);
        assert_eq!(aligned.len(), 2);
        assert_eq!(aligned.flow.missing_count(), 2);
    }
}
