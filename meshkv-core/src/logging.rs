//! Logging subsystem for meshkv
//!
//! Thin initialization layer over the `tracing` crate. Honors
//! `RUST_LOG` when set; otherwise falls back to the configured level.

use crate::config::LoggingConfig;
use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Errors that can occur while initializing logging
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),
}

/// Severity level for log output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
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
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for the logging subsystem
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub json_format: bool,
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: LogLevel::default(),
            json_format: false,
            with_target: true,
        }
    }
}

impl LogConfig {
    pub fn new(level: LogLevel) -> Self {
        LogConfig {
            level,
            ..Default::default()
        }
    }

    /// Build from the node configuration's logging section
    pub fn from_settings(settings: &LoggingConfig) -> Self {
        LogConfig {
            level: LogLevel::parse(&settings.level).unwrap_or_default(),
            json_format: settings.json_format,
            with_target: settings.with_target,
        }
    }

    pub fn json_format(mut self, enabled: bool) -> Self {
        self.json_format = enabled;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }
}

/// Initialize logging with default configuration
pub fn init_logging() -> Result<(), LoggingError> {
    init_logging_with_config(LogConfig::default())
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: LogConfig) -> Result<(), LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let fmt_layer = fmt::layer().with_target(config.with_target);

    if config.json_format {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json())
            .try_init()
            .map_err(|e| LoggingError::InitializationFailed(e.to_string()))?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| LoggingError::InitializationFailed(e.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse_and_display() {
        assert_eq!(LogLevel::parse("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("nope"), None);
        assert_eq!(LogLevel::Error.to_string(), "error");
    }

    #[test]
    fn test_config_from_settings() {
        let settings = LoggingConfig {
            level: "debug".to_string(),
            json_format: true,
            with_target: false,
        };
        let config = LogConfig::from_settings(&settings);

        assert_eq!(config.level, LogLevel::Debug);
        assert!(config.json_format);
        assert!(!config.with_target);
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        let settings = LoggingConfig {
            level: "chatty".to_string(),
            ..Default::default()
        };
        assert_eq!(LogConfig::from_settings(&settings).level, LogLevel::Info);
    }
}
