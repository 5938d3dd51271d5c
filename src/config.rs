//! Configuration loading and validation.
//!
//! Precedence: built-in defaults -> optional config file -> `FEEDWATCH_*`
//! environment overlay (`__` separator for nested keys).

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::WatchError;
use crate::logging::LoggingConfig;

/// Identity of the agent this process acts as.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Stable agent identifier used for memory/dedup key derivation.
    pub agent_id: String,
    /// The agent's own feed username. Posts by this username are never
    /// responded to.
    pub username: String,
    #[serde(default)]
    pub display_name: String,
}

/// Settings for the watch lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    /// Individual post ids processed once per reconciliation pass.
    pub post_ids: Vec<String>,
    /// Usernames under continuous polling.
    pub usernames: Vec<String>,
    /// Poll interval per watched username.
    pub poll_interval_secs: u64,
    /// Lower bound of the jittered reconciliation interval.
    pub reconcile_min_secs: u64,
    /// Upper bound of the jittered reconciliation interval.
    pub reconcile_max_secs: u64,
    /// Maximum items fetched per poll tick.
    pub page_size: usize,
    /// Delay between successive items handed to the pipeline.
    pub item_delay_ms: u64,
    /// Delay between successive watcher starts during reconciliation.
    pub start_stagger_ms: u64,
    /// Home-timeline snapshot size.
    pub timeline_limit: usize,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            post_ids: Vec::new(),
            usernames: Vec::new(),
            poll_interval_secs: 300,
            reconcile_min_secs: 120,
            reconcile_max_secs: 300,
            page_size: 10,
            item_delay_ms: 1000,
            start_stagger_ms: 2000,
            timeline_limit: 50,
        }
    }
}

impl WatchSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }

    pub fn start_stagger(&self) -> Duration {
        Duration::from_millis(self.start_stagger_ms)
    }

    /// Inclusive jitter bounds for the reconciliation loop.
    pub fn jitter_range(&self) -> (Duration, Duration) {
        (
            Duration::from_secs(self.reconcile_min_secs),
            Duration::from_secs(self.reconcile_max_secs),
        )
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedwatchConfig {
    pub agent: AgentConfig,
    #[serde(default)]
    pub watch: WatchSettings,
    /// Root directory for the filesystem cache store. Defaults to the
    /// platform cache directory when unset.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FeedwatchConfig {
    /// Load configuration from an optional file plus the environment.
    pub fn load(file: Option<&Path>) -> Result<Self, WatchError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path.to_path_buf()));
        }
        let builder = builder.add_source(
            Environment::with_prefix("FEEDWATCH")
                .separator("__")
                .try_parsing(true),
        );

        let config: FeedwatchConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the watch core cannot run with.
    pub fn validate(&self) -> Result<(), WatchError> {
        if self.agent.agent_id.trim().is_empty() {
            return Err(WatchError::ConfigError("agent.agent_id is required".to_string()));
        }
        if self.agent.username.trim().is_empty() {
            return Err(WatchError::ConfigError("agent.username is required".to_string()));
        }
        if self.watch.reconcile_min_secs > self.watch.reconcile_max_secs {
            return Err(WatchError::ConfigError(format!(
                "reconcile_min_secs ({}) exceeds reconcile_max_secs ({})",
                self.watch.reconcile_min_secs, self.watch.reconcile_max_secs
            )));
        }
        if self.watch.page_size == 0 {
            return Err(WatchError::ConfigError("watch.page_size must be positive".to_string()));
        }
        Ok(())
    }
}
