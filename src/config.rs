//! Service Configuration
//!
//! Settings for the poll service: where the archive lives, how often the
//! background workers run, and the default poll duration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Path of the poll archive file
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Seconds between expiration sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Seconds between autosave passes
    #[serde(default = "default_save_interval_secs")]
    pub save_interval_secs: u64,

    /// Poll duration in minutes when a creator does not set one
    #[serde(default = "default_duration_mins")]
    pub default_duration_mins: u64,
}

fn default_data_path() -> PathBuf {
    PathBuf::from("polls_data.json")
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_save_interval_secs() -> u64 {
    300
}

fn default_duration_mins() -> u64 {
    60
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            sweep_interval_secs: default_sweep_interval_secs(),
            save_interval_secs: default_save_interval_secs(),
            default_duration_mins: default_duration_mins(),
        }
    }
}

impl ServiceConfig {
    /// Interval between expiration sweeps
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Interval between autosave passes
    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs)
    }

    /// Default duration for drafts that do not set one
    ///
    /// Out-of-range values saturate at the maximum representable duration
    /// instead of wrapping.
    pub fn default_duration(&self) -> chrono::Duration {
        i64::try_from(self.default_duration_mins)
            .ok()
            .and_then(chrono::Duration::try_minutes)
            .unwrap_or(chrono::Duration::MAX)
    }
}
