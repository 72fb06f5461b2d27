//! Pump station imputation runner
//!
//! Reads raw flow and level exports for every station in the registry,
//! fills the gaps and writes one filled file per series.
//!
//! Usage:
//!   cargo run --release -- --input data --output output
//!   cargo run --release -- --method simple --station DRU
//!
//! Options:
//!   --config PATH      station registry (default: stations.toml)
//!   --input DIR        directory with <CODE>_flow.json / <CODE>_level.json (default: data)
//!   --output DIR       directory for filled files (default: output)
//!   --method NAME      heuristic | simple | none (default: heuristic)
//!   --station CODE     only run this station
//!   --workers N        worker threads (default: available cores)
//!   --log-level LEVEL  DEBUG | INFO | WARNING | ERROR (default: INFO)

use pumpflow::config::load_config;
use pumpflow::imputation::FlowImputation;
use pumpflow::logging;
use pumpflow::runner::{RunOptions, run_all};
use std::env;
use std::path::PathBuf;
use std::thread;

fn usage(program: &str) -> String {
    format!(
        "Usage: {} [--config PATH] [--input DIR] [--output DIR] [--method heuristic|simple|none] \
         [--station CODE] [--workers N] [--log-level LEVEL]",
        program
    )
}

fn main() {
    println!("💧 Pump Station Flow Imputation");
    println!("===============================\n");

    let args: Vec<String> = env::args().collect();
    let mut config_path = PathBuf::from("stations.toml");
    let mut input_dir = PathBuf::from("data");
    let mut output_dir = PathBuf::from("output");
    let mut method = FlowImputation::Heuristic;
    let mut station: Option<String> = None;
    let mut workers = thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
    let mut log_level = String::from("INFO");

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let Some(value) = args.get(i + 1) else {
            eprintln!("Error: {} requires a value", flag);
            eprintln!("{}", usage(&args[0]));
            std::process::exit(1);
        };
        match flag {
            "--config" => config_path = PathBuf::from(value),
            "--input" => input_dir = PathBuf::from(value),
            "--output" => output_dir = PathBuf::from(value),
            "--station" => station = Some(value.clone()),
            "--log-level" => log_level = value.clone(),
            "--method" => match value.parse() {
                Ok(m) => method = m,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            },
            "--workers" => match value.parse() {
                Ok(n) => workers = n,
                Err(_) => {
                    eprintln!("Error: --workers requires a number");
                    std::process::exit(1);
                }
            },
            _ => {
                eprintln!("Unknown argument: {}", flag);
                eprintln!("{}", usage(&args[0]));
                std::process::exit(1);
            }
        }
        i += 2;
    }

    if let Err(e) = logging::init(&log_level) {
        eprintln!("Warning: logging not initialised: {}", e);
    }

    println!("📋 Loading {}...", config_path.display());
    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Configuration failed: {}\n", e);
            std::process::exit(1);
        }
    };
    println!("✓ {} stations configured\n", config.stations.len());

    let options = RunOptions { input_dir, output_dir, method, workers };
    println!(
        "⚙️  Imputing with {:?} method on {} threads...",
        options.method, options.workers
    );

    let results = match run_all(&config, &options, station.as_deref()) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("\n❌ {}\n", e);
            std::process::exit(1);
        }
    };

    let mut failures = 0;
    for (code, result) in &results {
        match result {
            Ok(s) => println!(
                "   ✓ {} - {} points, flow {} filled / {} unresolved, level {} filled / {} unresolved",
                code, s.points, s.flow_filled, s.flow_unresolved, s.level_filled, s.level_unresolved
            ),
            Err(e) => {
                failures += 1;
                eprintln!("   ✗ {} - {}", code, e);
            }
        }
    }

    println!(
        "\n📊 {} of {} stations written to {}",
        results.len() - failures,
        results.len(),
        options.output_dir.display()
    );
    if failures > 0 {
        std::process::exit(1);
    }
}
