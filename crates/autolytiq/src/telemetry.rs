//! Log subscriber setup shared by the API server and the admin CLI.
//!
//! `RUST_LOG` wins when set; otherwise `APP_LOG_LEVEL` seeds the filter.
//! SQL and HTTP plumbing crates are held at `warn` unless the directive
//! names them explicitly.

use crate::config::{LogFormat, TelemetryConfig};
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Dependency targets that drown out request logs at `debug`.
const QUIET_TARGETS: [&str; 3] = ["hyper", "rusqlite", "lettre"];

#[derive(Debug)]
pub enum TelemetryError {
    Filter { directive: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::Filter { directive, .. } => {
                write!(f, "APP_LOG_LEVEL '{directive}' is not a valid log filter")
            }
            TelemetryError::Subscriber(err) => {
                write!(f, "log subscriber already installed: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::Filter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Builds the filter from a configured directive such as `info` or
/// `autolytiq=debug,tower_http=info`.
pub fn log_filter(directive: &str) -> Result<EnvFilter, TelemetryError> {
    let mut spec = directive.trim().to_string();
    for target in QUIET_TARGETS {
        if !spec.split(',').any(|part| part.trim().starts_with(target)) {
            spec.push_str(&format!(",{target}=warn"));
        }
    }

    EnvFilter::try_new(&spec).map_err(|source| TelemetryError::Filter {
        directive: directive.to_string(),
        source,
    })
}

/// Installs the global subscriber in the configured output format.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => log_filter(&config.log_level)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false);

    match config.log_format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    }
    .map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiets_dependency_targets_unless_named() {
        let filter = log_filter("debug").expect("filter builds").to_string();
        assert!(filter.contains("hyper=warn"));
        assert!(filter.contains("rusqlite=warn"));
        assert!(filter.contains("lettre=warn"));

        let filter = log_filter("info,rusqlite=trace")
            .expect("filter builds")
            .to_string();
        assert!(filter.contains("rusqlite=trace"));
        assert!(!filter.contains("rusqlite=warn"));
    }

    #[test]
    fn rejects_unparseable_filter() {
        std::env::remove_var("RUST_LOG");
        let config = TelemetryConfig {
            log_level: "autolytiq=verbose".to_string(),
            log_format: LogFormat::Compact,
        };
        let err = init(&config).expect_err("bad level");
        assert!(matches!(err, TelemetryError::Filter { .. }));
        assert_eq!(
            err.to_string(),
            "APP_LOG_LEVEL 'autolytiq=verbose' is not a valid log filter"
        );
    }
}
