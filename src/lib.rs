/// pumpflow: flow and level gap filling for sewer pump stations.
///
/// # Module structure
///
/// ```text
/// pumpflow
/// ├── model        — shared data types (Reading, Series, FillReport, ImputationError, …)
/// ├── config       — station registry and tuning parameters (stations.toml)
/// ├── logging      — tracing subscriber setup for the binaries
/// ├── preprocess   — reading cleanup and flow/level alignment
/// ├── stats        — mean, population std, quantile
/// ├── imputation
/// │   ├── monotonicity — rising/falling/extremum window labels
/// │   ├── level        — time-weighted interpolation of level gaps
/// │   ├── flow         — level-driven heuristic for flow gaps
/// │   └── simple       — carry-forward-or-zero flow fallback
/// ├── analysis
/// │   ├── peaks        — prominence-filtered extrema
/// │   ├── groupings    — flow burst / level drawdown segmentation
/// │   ├── calibration  — pump event summaries and coefficient fit
/// │   ├── hourly       — hourly volume and calendar predictors
/// │   └── dry_weather  — rain summary and dry-weather flow table
/// ├── ingest
/// │   ├── tabular  — JSON sensor exports in, filled rows out
/// │   └── fixtures (test only) — synthetic pump cycles and payloads
/// └── runner       — thread-pooled batch imputation over stations
/// ```

pub mod analysis;
pub mod config;
pub mod imputation;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod preprocess;
pub mod runner;
pub mod stats;
