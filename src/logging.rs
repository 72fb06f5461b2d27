/// Diagnostic logging setup.
///
/// The library only emits `tracing` events; installing a subscriber is left
/// to binaries. Level names follow the usual operator spelling
/// (DEBUG/INFO/WARNING/ERROR) and are mapped to `tracing` directives. Any
/// other string is passed through as a full `EnvFilter` directive, e.g.
/// `pumpflow::imputation=debug`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Maps an operator level name to a `tracing` filter directive.
pub fn normalise_level(level: &str) -> String {
    match level.to_uppercase().as_str() {
        "TRACE" => "trace".to_string(),
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARN" | "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => level.to_string(),
    }
}

/// Installs a console subscriber at `level`, falling back to `info` when
/// the directive does not parse.
///
/// # Errors
/// When a global subscriber is already installed.
pub fn init(level: &str) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_new(normalise_level(level)).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(normalise_level("DEBUG"), "debug");
        assert_eq!(normalise_level("warning"), "warn");
        assert_eq!(normalise_level("Error"), "error");
    }

    #[test]
    fn test_directives_pass_through() {
        assert_eq!(normalise_level("pumpflow=debug"), "pumpflow=debug");
    }
}
