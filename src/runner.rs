/// Batch imputation over the configured stations.
///
/// Each station is read from `<CODE>_flow.json` and `<CODE>_level.json` in
/// the input directory, imputed, and written to `<CODE>_flow_imputed.json`
/// and `<CODE>_level_filled.json` in the output directory. Stations are
/// independent, so they run on a thread pool and report back over a
/// channel; results come back in configuration order.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use threadpool::ThreadPool;
use tracing::{info, info_span, warn};

use crate::config::{PumpflowConfig, StationConfig};
use crate::imputation::{FlowImputation, HeuristicParams, impute_station};
use crate::ingest::tabular::{parse_readings, render_rows, to_rows};
use crate::model::Reading;

pub type RunError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub method: FlowImputation,
    pub workers: usize,
}

/// Per-station counts for the run summary.
#[derive(Debug, Clone, PartialEq)]
pub struct StationSummary {
    pub code: String,
    pub points: usize,
    pub flow_filled: usize,
    pub flow_unresolved: usize,
    pub level_filled: usize,
    pub level_unresolved: usize,
}

pub fn input_path(dir: &Path, code: &str, kind: &str) -> PathBuf {
    dir.join(format!("{}_{}.json", code, kind))
}

pub fn read_readings(path: &Path) -> Result<Vec<Reading>, RunError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    Ok(parse_readings(&contents)?)
}

/// Imputes one station and writes its two output files.
pub fn run_station(
    station: &StationConfig,
    params: &HeuristicParams,
    options: &RunOptions,
) -> Result<StationSummary, RunError> {
    let flow = read_readings(&input_path(&options.input_dir, &station.code, "flow"))?;
    let level = read_readings(&input_path(&options.input_dir, &station.code, "level"))?;

    let imputed = impute_station(flow, level, options.method, params)?;

    fs::create_dir_all(&options.output_dir)?;
    let flow_rows = to_rows(&imputed.observed.flow, &imputed.flow);
    let level_rows = to_rows(&imputed.observed.level, &imputed.level);
    fs::write(
        options.output_dir.join(format!("{}_flow_imputed.json", station.code)),
        render_rows(&flow_rows)?,
    )?;
    fs::write(
        options.output_dir.join(format!("{}_level_filled.json", station.code)),
        render_rows(&level_rows)?,
    )?;

    let summary = StationSummary {
        code: station.code.clone(),
        points: imputed.observed.len(),
        flow_filled: imputed.flow.filled,
        flow_unresolved: imputed.flow.series.missing_count(),
        level_filled: imputed.level.filled,
        level_unresolved: imputed.level.series.missing_count(),
    };
    info!(
        points = summary.points,
        flow_filled = summary.flow_filled,
        flow_unresolved = summary.flow_unresolved,
        "station written"
    );
    Ok(summary)
}

/// Runs every station in `stations` on a pool of `options.workers` threads.
pub fn run_stations(
    stations: &[StationConfig],
    defaults: &HeuristicParams,
    options: &RunOptions,
) -> Vec<(String, Result<StationSummary, RunError>)> {
    let pool = ThreadPool::new(options.workers.max(1));
    let (tx, rx) = mpsc::channel();

    for (index, station) in stations.iter().enumerate() {
        let tx = tx.clone();
        let station = station.clone();
        let params = station.imputation_params(defaults);
        let options = options.clone();
        pool.execute(move || {
            let span = info_span!("station", code = %station.code);
            let _entered = span.enter();
            let result = run_station(&station, &params, &options);
            if let Err(e) = &result {
                warn!(error = %e, "station failed");
            }
            // The receiver outlives the pool.
            let _ = tx.send((index, result));
        });
    }
    drop(tx);

    let mut slots: Vec<Option<Result<StationSummary, RunError>>> =
        stations.iter().map(|_| None).collect();
    for (index, result) in rx.iter() {
        slots[index] = Some(result);
    }

    stations
        .iter()
        .zip(slots)
        .map(|(station, slot)| {
            let result = slot.unwrap_or_else(|| Err("worker thread panicked".into()));
            (station.code.clone(), result)
        })
        .collect()
}

/// Runs all configured stations, or only `only` when given.
pub fn run_all(
    config: &PumpflowConfig,
    options: &RunOptions,
    only: Option<&str>,
) -> Result<Vec<(String, Result<StationSummary, RunError>)>, RunError> {
    let stations: Vec<StationConfig> = match only {
        Some(code) => vec![
            config
                .station(code)
                .cloned()
                .ok_or_else(|| format!("station '{}' is not in the configuration", code))?,
        ],
        None => config.stations.clone(),
    };
    Ok(run_stations(&stations, &config.imputation, options))
}
