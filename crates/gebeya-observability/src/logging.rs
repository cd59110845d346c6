//! Structured logging setup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{fmt as layer_fmt, prelude::*, EnvFilter};

/// Target for money-movement records (escrow holds, releases, reversals).
///
/// Operators can route it separately, e.g. `RUST_LOG=audit=info`.
pub const AUDIT_TARGET: &str = "audit";

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trace => write!(f, "TRACE"),
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(LoggingError::InvalidLevel(other.to_string())),
        }
    }
}

/// Output format for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (for production/log aggregation).
    Json,
    /// Human-readable format (for development).
    #[default]
    Human,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub format: LogFormat,
    /// Full `EnvFilter` directive; overrides `level` when set.
    #[serde(default)]
    pub filter: Option<String>,
}

impl LogConfig {
    pub fn new(level: LogLevel, format: LogFormat) -> Self {
        Self {
            level,
            format,
            filter: None,
        }
    }

    /// The filter directive in effect, ignoring `RUST_LOG`.
    pub fn directive(&self) -> String {
        self.filter
            .clone()
            .unwrap_or_else(|| self.level.as_str().to_string())
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over the configured directive when it is set. Fails if
/// a subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.directive())
            .map_err(|e| LoggingError::InvalidFilter(e.to_string()))?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Json => registry
            .with(
                layer_fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Human => registry
            .with(layer_fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|e| LoggingError::Init(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse() {
        assert_eq!("INFO".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_directive_prefers_filter() {
        let mut config = LogConfig::new(LogLevel::Debug, LogFormat::Json);
        assert_eq!(config.directive(), "debug");
        config.filter = Some("gebeya_market=trace,audit=info".to_string());
        assert_eq!(config.directive(), "gebeya_market=trace,audit=info");
    }

    #[test]
    fn test_config_deserialize() {
        let config: LogConfig = serde_json::from_str(r#"{"level":"warn","format":"json"}"#).unwrap();
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.filter, None);
    }

    #[test]
    fn test_second_init_fails() {
        let config = LogConfig::default();
        let _ = init_logging(&config);
        assert!(matches!(init_logging(&config), Err(LoggingError::Init(_))));
    }
}
