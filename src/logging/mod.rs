//! # Logging System
//!
//! Wires the `log` facade to `env_logger`, with one target per decision
//! stage (see [`features::LogFeature`]) and per-feature levels taken from
//! [`config::LogConfig`].

pub mod config;
pub mod features;

use config::{parse_level, LogConfig};
use features::LogFeature;
use once_cell::sync::OnceCell;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Global logging configuration instance
static LOGGING_CONFIG: OnceCell<Arc<RwLock<LogConfig>>> = OnceCell::new();

pub struct LoggingSystem;

impl LoggingSystem {
    /// Initialize the logging system with default configuration
    pub async fn init_default() -> Result<(), LoggingError> {
        let config = LogConfig::from_env()?;
        Self::init_with_config(config).await
    }

    /// Initialize the logging system with a custom configuration
    pub async fn init_with_config(config: LogConfig) -> Result<(), LoggingError> {
        config.validate()?;

        let mut builder = build_logger(&config);

        LOGGING_CONFIG
            .set(Arc::new(RwLock::new(config)))
            .map_err(|_| LoggingError::AlreadyInitialized)?;

        builder
            .try_init()
            .map_err(|e| LoggingError::Config(format!("Failed to install logger: {}", e)))?;

        Ok(())
    }

    /// Get the global logging configuration
    pub async fn get_config() -> Option<LogConfig> {
        if let Some(config_arc) = LOGGING_CONFIG.get() {
            let config_guard = config_arc.read().await;
            Some(config_guard.clone())
        } else {
            None
        }
    }
}

/// Build an `env_logger` builder honoring the default and per-feature levels.
///
/// `RUST_LOG` still applies on top, so ad hoc debugging keeps working.
pub fn build_logger(config: &LogConfig) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    if !config.console.enabled {
        builder.filter_level(log::LevelFilter::Off);
        return builder;
    }

    let default_level =
        parse_level(&config.general.default_level).unwrap_or(log::LevelFilter::Info);
    builder.filter_level(default_level);

    for feature in LogFeature::ALL {
        if let Some(level) = config
            .features
            .get(feature.name())
            .and_then(|level| parse_level(level))
        {
            builder.filter_module(feature.target(), level);
        }
    }

    builder.write_style(if config.general.enable_colors {
        env_logger::WriteStyle::Auto
    } else {
        env_logger::WriteStyle::Never
    });

    let include_timestamp = config.console.include_timestamp;
    let include_module = config.console.include_module;
    builder.format(move |buf, record| {
        if include_timestamp {
            write!(buf, "{} ", buf.timestamp())?;
        }
        if include_module {
            write!(buf, "[{}] ", record.target())?;
        }
        writeln!(buf, "{:<5} {}", record.level(), record.args())
    });

    builder.parse_default_env();
    builder
}

/// Logging system errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Logging system already initialized")]
    AlreadyInitialized,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Config error: {0}")]
    ConfigError(#[from] crate::logging::config::ConfigError),
}
