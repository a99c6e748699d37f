// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Worker configuration
//!
//! Loaded from a TOML file when a path is given on the command line;
//! every field has a default so a bare `loam-worker` starts with the
//! stock concurrency profile.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
    /// Parallel consumers on the automation queue
    pub automation_concurrency: usize,
    /// Parallel consumers on the notification queue
    pub notification_concurrency: usize,
    /// Parallel consumers on the email queue
    pub email_concurrency: usize,
    /// Global outbound email rate cap, shared across email consumers
    pub email_rate_per_second: u32,
    /// Days without activity before an open deal counts as stale
    pub stale_after_days: i64,
    /// How long an idle consumer sleeps before polling again
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// How often the recurring scheduler looks for due jobs
    #[serde(with = "humantime_serde")]
    pub scheduler_tick: Duration,
    /// Fallback log filter when RUST_LOG is unset
    pub log_filter: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            automation_concurrency: 5,
            notification_concurrency: 10,
            email_concurrency: 5,
            email_rate_per_second: 10,
            stale_after_days: loam_engine::scans::DEFAULT_STALE_AFTER_DAYS,
            poll_interval: Duration::from_millis(500),
            scheduler_tick: Duration::from_secs(15),
            log_filter: None,
        }
    }
}

impl WorkerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
