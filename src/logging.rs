//! Structured logging setup.
//!
//! Thin wrapper over `tracing-subscriber`: configurable level, text or JSON
//! format, and stdout/stderr/file destinations. Module-level overrides ride
//! on the same `EnvFilter` syntax; the `FEEDWATCH_LOG` environment variable
//! wins over the config file when set.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::error::WatchError;

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off.
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format: text or json.
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr, or file.
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path when output is `file`.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Colored output (text format, terminal destinations only).
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific level overrides, e.g. `feedwatch::watch = "debug"`.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Directive string for the `EnvFilter`: base level plus module overrides.
    fn filter_directives(&self) -> String {
        let mut directives = vec![self.level.clone()];
        for (module, level) in &self.modules {
            directives.push(format!("{}={}", module, level));
        }
        directives.join(",")
    }
}

/// Initialize global logging from the configuration.
///
/// Safe to call once per process; later calls fail as the global subscriber
/// is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<(), WatchError> {
    if !config.enabled {
        Registry::default()
            .with(EnvFilter::new("off"))
            .try_init()
            .map_err(|e| WatchError::ConfigError(format!("failed to set subscriber: {}", e)))?;
        return Ok(());
    }

    let filter = build_env_filter(config)?;
    let json = config.format == "json";
    let base = Registry::default().with(filter);

    match config.output.as_str() {
        "file" => {
            let path = config.file.clone().ok_or_else(|| {
                WatchError::ConfigError("logging.file is required for file output".to_string())
            })?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let writer = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            if json {
                base.with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_writer(writer),
                )
                .try_init()
            } else {
                base.with(
                    fmt::layer()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .try_init()
            }
        }
        "stdout" => {
            if json {
                base.with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_writer(std::io::stdout),
                )
                .try_init()
            } else {
                base.with(
                    fmt::layer()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(config.color)
                        .with_writer(std::io::stdout),
                )
                .try_init()
            }
        }
        _ => {
            if json {
                base.with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_writer(std::io::stderr),
                )
                .try_init()
            } else {
                base.with(
                    fmt::layer()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(config.color)
                        .with_writer(std::io::stderr),
                )
                .try_init()
            }
        }
    }
    .map_err(|e| WatchError::ConfigError(format!("failed to set subscriber: {}", e)))
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, WatchError> {
    if let Ok(filter) = EnvFilter::try_from_env("FEEDWATCH_LOG") {
        return Ok(filter);
    }
    EnvFilter::try_new(config.filter_directives())
        .map_err(|e| WatchError::ConfigError(format!("invalid log filter: {}", e)))
}
