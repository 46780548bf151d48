//! # Pipeline Configuration
//!
//! Environment-aware configuration for the batch pipeline. Values come from
//! an optional `sweeper.toml` file layered under `SWEEPER_`-prefixed
//! environment variables, with safe defaults for embedded use.

use crate::error::{Result, SweeperError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunable settings for batch submission and status polling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweeperConfig {
    /// Page size used when a caller does not supply one
    pub default_batch_size: u64,

    /// Repeat interval of the status monitor timer, in milliseconds.
    /// Bounds completion-detection latency, not processing latency.
    pub monitor_interval_ms: u64,

    /// Upper bound on job executions per drain of the in-process scheduler.
    /// A stalled pipeline hits this cap instead of spinning forever.
    pub max_drain_ticks: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            default_batch_size: 100,
            monitor_interval_ms: 5_000,
            max_drain_ticks: 10_000,
        }
    }
}

impl SweeperConfig {
    /// Load configuration from the default sources: `sweeper.toml` in the
    /// working directory (if present) overridden by `SWEEPER_*` environment
    /// variables.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from an explicit file path layered under the
    /// environment. Useful for tests that must not touch process state.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder.add_source(config::File::with_name("sweeper").required(false)),
        };

        let settings = builder
            .add_source(config::Environment::with_prefix("SWEEPER"))
            .build()
            .map_err(|e| SweeperError::configuration(e.to_string()))?;

        let config: SweeperConfig = settings
            .try_deserialize()
            .map_err(|e| SweeperError::configuration(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings no pipeline run could make progress with
    pub fn validate(&self) -> Result<()> {
        if self.default_batch_size == 0 {
            return Err(SweeperError::configuration(
                "default_batch_size must be greater than zero",
            ));
        }
        if self.max_drain_ticks == 0 {
            return Err(SweeperError::configuration(
                "max_drain_ticks must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Monitor repeat interval as a [`Duration`]
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }
}
