/// Station registry and tuning parameters - parses stations.toml
///
/// Keeps station metadata and imputation knobs out of the code so a new
/// pump station can be added, or a threshold retuned, without recompiling.
/// Every section is optional; missing values fall back to the defaults of
/// the corresponding parameter structs.

use serde::Deserialize;
use std::collections::HashSet;
use std::error::Error;
use std::fs;
use std::path::Path;

use crate::analysis::groupings::DEFAULT_LEVEL_PROMINENCE;
use crate::imputation::HeuristicParams;

// ============================================================================
// TOML Configuration Structures
// ============================================================================

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PumpflowConfig {
    pub imputation: HeuristicParams,
    pub segmentation: SegmentationConfig,
    pub dry_weather: DryWeatherConfig,
    #[serde(rename = "station")]
    pub stations: Vec<StationConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Minimum prominence of level maxima/minima, in level units.
    pub level_prominence: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self { level_prominence: DEFAULT_LEVEL_PROMINENCE }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DryWeatherConfig {
    /// Daily rain total (mm) from which a day counts as wet.
    pub dry_threshold: f64,
    /// Consecutive dry days required before a day is used.
    pub min_dry_series: u32,
}

impl Default for DryWeatherConfig {
    fn default() -> Self {
        Self { dry_threshold: 1.0, min_dry_series: 1 }
    }
}

/// One pump station
#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    /// Short code used in input/output file names, e.g. "DRU".
    pub code: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub imputation: ImputationOverrides,
}

/// Per-station replacements for `[imputation]` values
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImputationOverrides {
    pub epsilon: Option<f64>,
    pub beta: Option<usize>,
    pub horizon: Option<usize>,
    pub on_level_quantile: Option<f64>,
    pub on_level: Option<f64>,
    pub max_coefficient_of_variation: Option<f64>,
}

impl StationConfig {
    /// Global parameters with this station's overrides applied.
    pub fn imputation_params(&self, defaults: &HeuristicParams) -> HeuristicParams {
        let o = &self.imputation;
        HeuristicParams {
            epsilon: o.epsilon.unwrap_or(defaults.epsilon),
            beta: o.beta.unwrap_or(defaults.beta),
            horizon: o.horizon.unwrap_or(defaults.horizon),
            on_level_quantile: o.on_level_quantile.unwrap_or(defaults.on_level_quantile),
            on_level: o.on_level.or(defaults.on_level),
            max_coefficient_of_variation: o
                .max_coefficient_of_variation
                .unwrap_or(defaults.max_coefficient_of_variation),
        }
    }
}

impl PumpflowConfig {
    pub fn station(&self, code: &str) -> Option<&StationConfig> {
        self.stations.iter().find(|s| s.code.eq_ignore_ascii_case(code))
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Parses configuration text and checks it for duplicate station codes
/// and out-of-range parameters.
pub fn parse_config(contents: &str) -> Result<PumpflowConfig, Box<dyn Error>> {
    let config: PumpflowConfig = toml::from_str(contents)?;

    let mut seen = HashSet::new();
    for station in &config.stations {
        if !seen.insert(station.code.to_uppercase()) {
            return Err(format!("duplicate station code '{}'", station.code).into());
        }
        check_params(&station.code, &station.imputation_params(&config.imputation))?;
    }
    check_params("[imputation]", &config.imputation)?;

    Ok(config)
}

fn check_params(context: &str, params: &HeuristicParams) -> Result<(), Box<dyn Error>> {
    if params.epsilon < 0.0 {
        return Err(format!("{}: epsilon must not be negative", context).into());
    }
    if params.horizon == 0 {
        return Err(format!("{}: horizon must be at least 1", context).into());
    }
    if !(0.0..=1.0).contains(&params.on_level_quantile) {
        return Err(format!("{}: on_level_quantile must lie in [0, 1]", context).into());
    }
    Ok(())
}

/// Loads and validates a configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PumpflowConfig, Box<dyn Error>> {
    let contents = fs::read_to_string(path.as_ref())
        .map_err(|e| format!("failed to read {}: {}", path.as_ref().display(), e))?;
    parse_config(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn repo_config() -> PumpflowConfig {
        load_config(Path::new(env!("CARGO_MANIFEST_DIR")).join("stations.toml"))
            .expect("stations.toml should load")
    }

    #[test]
    fn test_repo_config_loads() {
        let config = repo_config();
        assert!(config.stations.len() >= 10, "Should list the catchment's pump stations");
        for station in &config.stations {
            assert!(!station.code.is_empty());
            assert!((50.0..54.0).contains(&station.latitude), "{} outside NL", station.name);
            assert!((3.0..8.0).contains(&station.longitude), "{} outside NL", station.name);
        }
    }

    #[test]
    fn test_drunen_present() {
        let config = repo_config();
        let drunen = config.station("dru").expect("Drunen should exist in config");
        assert_eq!(drunen.name, "Drunen");
        assert_eq!(drunen.latitude, 51.680344);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.imputation, HeuristicParams::default());
        assert_eq!(config.segmentation.level_prominence, 0.5);
        assert_eq!(config.dry_weather, DryWeatherConfig::default());
        assert!(config.stations.is_empty());
    }

    #[test]
    fn test_station_overrides_apply() {
        let config = parse_config(
            r#"
            [imputation]
            epsilon = 0.02

            [[station]]
            code = "AAA"
            name = "Alpha"
            latitude = 51.7
            longitude = 5.2

            [station.imputation]
            on_level = 0.9
            horizon = 3
            "#,
        )
        .unwrap();

        let params = config.stations[0].imputation_params(&config.imputation);
        assert_eq!(params.epsilon, 0.02);
        assert_eq!(params.on_level, Some(0.9));
        assert_eq!(params.horizon, 3);
        assert_eq!(params.beta, 4);
    }

    #[test]
    fn test_duplicate_codes_rejected() {
        let station = "[[station]]\ncode = \"AAA\"\nname = \"A\"\nlatitude = 51.0\nlongitude = 5.0\n";
        let text = format!("{}{}", station, station.replace("AAA", "aaa"));
        let err = parse_config(&text).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_invalid_quantile_rejected() {
        let err = parse_config("[imputation]\non_level_quantile = 1.5\n").unwrap_err();
        assert!(err.to_string().contains("on_level_quantile"));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[dry_weather]\ndry_threshold = 2.5").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.dry_weather.dry_threshold, 2.5);
        assert_eq!(config.dry_weather.min_dry_series, 1);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }
}
