//! Engine configuration.
//!
//! Every field has a default, so a partial JSON document (or `{}`) is a
//! valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for the fan-out, the evaluation pipeline and the evolution loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Milliseconds between evolution ticks
    pub evolution_interval_ms: u64,

    /// Executions required system-wide before the loop acts
    pub min_total_executions: u64,

    /// Executions a strategy needs before it can be ranked
    pub min_strategy_executions: u64,

    /// Absolute success-rate gap that triggers a disable
    pub disable_margin: f64,

    /// Capacity of the queue feeding the evaluation pipeline
    pub queue_capacity: usize,

    /// Number of executions retained in memory
    pub history_capacity: usize,

    /// Optional per-attempt timeout in milliseconds
    pub attempt_timeout_ms: Option<u64>,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            evolution_interval_ms: 30_000,
            min_total_executions: 10,
            min_strategy_executions: 5,
            disable_margin: 0.10,
            queue_capacity: 256,
            history_capacity: 1000,
            attempt_timeout_ms: None,
        }
    }
}

impl ShadowConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Set the evolution interval.
    pub fn with_evolution_interval(mut self, interval: Duration) -> Self {
        self.evolution_interval_ms = duration_ms(interval);
        self
    }

    /// Set the system-wide cold-start threshold.
    pub fn with_min_total_executions(mut self, min: u64) -> Self {
        self.min_total_executions = min;
        self
    }

    /// Set the per-strategy sample threshold.
    pub fn with_min_strategy_executions(mut self, min: u64) -> Self {
        self.min_strategy_executions = min;
        self
    }

    /// Set the disable margin.
    pub fn with_disable_margin(mut self, margin: f64) -> Self {
        self.disable_margin = margin;
        self
    }

    /// Set the pipeline queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the history capacity.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout_ms = Some(duration_ms(timeout));
        self
    }

    /// Evolution interval as a duration.
    pub fn evolution_interval(&self) -> Duration {
        Duration::from_millis(self.evolution_interval_ms.max(1))
    }

    /// Per-attempt timeout as a duration.
    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_ms.map(Duration::from_millis)
    }

    /// Queue capacity, never zero.
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.max(1)
    }
}

/// Whole milliseconds, at least one.
fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX).max(1)
}
