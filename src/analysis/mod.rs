/// Event analysis on filled pump station series.
///
/// Submodules:
/// - `peaks`       — prominence-filtered local maxima/minima.
/// - `groupings`   — tags flow bursts and level drawdowns with group ids.
/// - `calibration` — event summaries and the volume/level coefficient fit.
/// - `hourly`      — hourly pumped volume and calendar predictor columns.
/// - `dry_weather` — daily rain summary and the dry-weather flow table.

pub mod calibration;
pub mod dry_weather;
pub mod groupings;
pub mod hourly;
pub mod peaks;
