//! Subscriber setup for applications embedding the matcher
//!
//! The library itself only emits `tracing` events; this module installs a
//! global subscriber for callers that do not bring their own.

use crate::error::{MatchError, MatchResult};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error or any EnvFilter directive)
    pub level: String,
    pub format: LogFormat,
    pub use_colors: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            use_colors: true,
        }
    }
}

impl LoggingConfig {
    pub fn from_toml_str(source: &str) -> MatchResult<Self> {
        Ok(toml::from_str(source)?)
    }
}

/// Install a global subscriber
///
/// `RUST_LOG` takes precedence over `config.level`. Fails if a global
/// subscriber is already installed.
pub fn init(config: &LoggingConfig) -> MatchResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| MatchError::Config(format!("invalid log filter '{}': {e}", config.level)))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_ansi(config.use_colors))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_ansi(config.use_colors))
            .try_init(),
        #[cfg(feature = "logging-json")]
        LogFormat::Json => registry.with(fmt::layer().json().with_ansi(false)).try_init(),
        #[cfg(not(feature = "logging-json"))]
        LogFormat::Json => {
            return Err(MatchError::Config(
                "JSON log format requires the `logging-json` feature".to_string(),
            ))
        }
    };
    installed.map_err(|e| MatchError::Config(format!("logging already initialised: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_parses_from_toml() {
        let config = LoggingConfig::from_toml_str("level = \"debug\"\nformat = \"pretty\"\n").unwrap();
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.use_colors);
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(LoggingConfig::from_toml_str("format = \"xml\"").is_err());
    }
}
