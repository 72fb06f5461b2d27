/// Cheap flow filler used when the level-driven heuristic is not wanted.
///
/// A gap whose two positional neighbours both carry a value takes the
/// previous value. Every other gap becomes 0, i.e. the pump is assumed off.
/// This biases totals low but never leaves a gap behind.

use crate::model::{Point, Series};

pub fn fill_flow_simple(flow: &Series) -> Series {
    let points = flow.points();
    let present = |i: usize| points.get(i).is_some_and(|p| p.value.is_some());

    let filled = points
        .iter()
        .enumerate()
        .map(|(i, p)| match p.value {
            Some(_) => *p,
            None if i > 0 && present(i - 1) && present(i + 1) => {
                Point { timestamp: p.timestamp, value: points[i - 1].value }
            }
            None => Point::known(p.timestamp, 0.0),
        })
        .collect();

    Series::from_sorted(filled)
}
