//! Logging subsystem for the DHT node
//!
//! This module provides a unified logging interface using the `tracing` crate.
//! It supports different log levels and can be configured for various output formats.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod error;
mod level;

pub use error::LoggingError;
pub use level::LogLevel;

/// Configuration for the logging subsystem
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// The minimum log level to display
    pub level: LogLevel,
    /// Whether to include timestamps
    pub with_timestamp: bool,
    /// Whether to include target module information
    pub with_target: bool,
    /// Whether to use JSON formatting
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            with_timestamp: true,
            with_target: true,
            json_format: false,
        }
    }
}

impl LogConfig {
    /// Create a new LogConfig with specified level
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Set whether to include timestamps
    pub fn with_timestamp(mut self, enabled: bool) -> Self {
        self.with_timestamp = enabled;
        self
    }

    /// Set whether to include target information
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Set whether to use JSON formatting
    pub fn json_format(mut self, enabled: bool) -> Self {
        self.json_format = enabled;
        self
    }
}

/// Initialize the logging subsystem with default configuration
///
/// # Example
/// ```
/// use kadnode_core::logging::init_logging;
///
/// init_logging().expect("Failed to initialize logging");
/// ```
pub fn init_logging() -> Result<(), LoggingError> {
    init_logging_with_config(LogConfig::default())
}

/// Initialize the logging subsystem with custom configuration
///
/// # Example
/// ```
/// use kadnode_core::logging::{init_logging_with_config, LogConfig, LogLevel};
///
/// let config = LogConfig::new(LogLevel::Debug)
///     .with_timestamp(true)
///     .with_target(false);
///
/// init_logging_with_config(config).expect("Failed to initialize logging");
/// ```
pub fn init_logging_with_config(config: LogConfig) -> Result<(), LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let fmt_layer = fmt::layer()
        .with_target(config.with_target)
        .with_timer(if config.with_timestamp {
            fmt::time::time()
        } else {
            fmt::time::time()
        });

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
