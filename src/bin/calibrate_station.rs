//! Pump Station Calibration
//!
//! Estimates the wet-well coefficient of one station: segments pump runs
//! into flow bursts and level drawdowns, pairs them, and regresses pumped
//! volume on the inflow-adjusted level change. When a rain export is
//! present the dry-weather flow table is printed as well.
//!
//! Usage:
//!   cargo run --bin calibrate_station -- --station DRU
//!
//! Options:
//!   --station CODE     station to calibrate (required)
//!   --config PATH      station registry (default: stations.toml)
//!   --input DIR        directory with <CODE>_flow.json, <CODE>_level.json
//!                      and optionally <CODE>_rain.json (default: data)
//!   --dry-only         only use dry days for the fit (needs rain data)
//!   --log-level LEVEL  DEBUG | INFO | WARNING | ERROR (default: INFO)

use pumpflow::analysis::calibration::{Calibration, prepare_series};
use pumpflow::analysis::dry_weather::{dry_days, dry_weather_table, restrict_to_days, summarize_rain};
use pumpflow::config::load_config;
use pumpflow::ingest::tabular::parse_rain;
use pumpflow::logging;
use pumpflow::runner::{RunError, input_path, read_readings};
use std::env;
use std::fs;
use std::path::PathBuf;

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn main() -> Result<(), RunError> {
    println!("📐 Pump Station Calibration");
    println!("===========================\n");

    let args: Vec<String> = env::args().collect();
    let Some(code) = arg_value(&args, "--station") else {
        eprintln!("Error: --station CODE is required");
        std::process::exit(1);
    };
    let config_path = arg_value(&args, "--config").unwrap_or_else(|| "stations.toml".to_string());
    let input_dir = PathBuf::from(arg_value(&args, "--input").unwrap_or_else(|| "data".to_string()));
    let dry_only = args.iter().any(|a| a == "--dry-only");
    let log_level = arg_value(&args, "--log-level").unwrap_or_else(|| "INFO".to_string());

    if let Err(e) = logging::init(&log_level) {
        eprintln!("Warning: logging not initialised: {}", e);
    }

    let config = load_config(&config_path).map_err(|e| e.to_string())?;
    let station = config
        .station(&code)
        .ok_or_else(|| format!("station '{}' is not in {}", code, config_path))?;
    println!("📋 {} ({})", station.name, station.code);

    println!("📥 Reading flow and level...");
    let flow = read_readings(&input_path(&input_dir, &station.code, "flow"))?;
    let level = read_readings(&input_path(&input_dir, &station.code, "level"))?;
    println!("✓ {} flow / {} level readings\n", flow.len(), level.len());

    let (mut flow, mut level) = prepare_series(flow, level);

    let rain_path = input_path(&input_dir, &station.code, "rain");
    if rain_path.exists() {
        println!("🌧️  Dry-weather analysis");
        let records = parse_rain(&fs::read_to_string(&rain_path)?)?;
        let summary = summarize_rain(&records, config.dry_weather.dry_threshold);
        let table = dry_weather_table(&flow, &summary, config.dry_weather.min_dry_series);
        println!("{}\n", table);

        if dry_only {
            let days = dry_days(&summary, config.dry_weather.min_dry_series);
            flow = restrict_to_days(&flow, &days);
            level = restrict_to_days(&level, &days);
            println!("✓ Restricted to {} dry days\n", days.len());
        }
    } else if dry_only {
        eprintln!("Warning: --dry-only ignored, {} not found\n", rain_path.display());
    }

    println!("⚙️  Segmenting pump events...");
    let calibration =
        Calibration::from_series(&flow, &level, config.segmentation.level_prominence)?;
    println!(
        "✓ {} flow bursts, {} level drawdowns\n",
        calibration.events.len(),
        calibration.drops.len()
    );

    match calibration.fit() {
        Ok(fit) => {
            println!("📊 volume ~ 1 + adjusted level change");
            println!("  - Slope (coefficient): {:.4}", fit.slope);
            println!("  - Intercept:           {:.4}", fit.intercept);
            println!("  - R²:                  {:.3}", fit.r_squared);
            println!("  - Events used:         {}", fit.samples);
        }
        Err(e) => {
            eprintln!("\n❌ Fit failed: {}\n", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
