//! Strategy model - a named, versioned execution policy.

use crate::id::StrategyId;
use crate::Time;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// A competing way of performing a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    /// Stable identifier, unique within a registry
    pub id: StrategyId,

    /// Display name
    pub name: String,

    /// Version tag (e.g. "v2", "2024-06-prompt")
    pub version: String,

    /// Free-form configuration handed to the task function
    pub config: HashMap<String, serde_json::Value>,

    /// Whether fan-out dispatches to this strategy
    pub enabled: bool,

    /// Running statistics, owned by the evaluation pipeline
    pub stats: StrategyStats,

    /// When the strategy was registered
    pub created_at: Time,
}

impl Strategy {
    /// Create a new enabled strategy with zeroed statistics.
    pub fn new(
        id: impl Into<StrategyId>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            config: HashMap::new(),
            enabled: true,
            stats: StrategyStats::default(),
            created_at: chrono::Utc::now(),
        }
    }

    /// Add a configuration entry.
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Register the strategy in the disabled state.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Combined score used to rank strategies.
    ///
    /// `success_rate * (1 - latency_in_seconds)`, with the latency term
    /// clamped to `[0, 1]`. Anything at or above one second scores zero, so
    /// the score never rewards failures.
    pub fn score(&self) -> f64 {
        let latency = (self.stats.mean_latency_ms / 1000.0).clamp(0.0, 1.0);
        self.stats.success_rate * (1.0 - latency)
    }

    /// Whether `self` ranks above `other` given their precomputed scores.
    ///
    /// Equal scores fall back to success rate; a full tie keeps `other`.
    pub fn outranks(&self, score: f64, other: &Strategy, other_score: f64) -> bool {
        score > other_score
            || (score == other_score && self.stats.success_rate > other.stats.success_rate)
    }
}

/// Streaming statistics for one strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyStats {
    /// Fraction of successful executions, 0.0..=1.0
    pub success_rate: f64,

    /// Mean wall-clock latency in milliseconds
    pub mean_latency_ms: f64,

    /// Number of executions folded into the statistics
    pub executions: u64,
}

impl StrategyStats {
    /// Fold one execution into the running averages.
    ///
    /// O(1); the history is never re-scanned.
    pub(crate) fn record(&mut self, success: bool, latency: Duration) {
        self.executions += 1;
        let n = self.executions as f64;
        let hit = if success { 1.0 } else { 0.0 };
        self.success_rate = (self.success_rate * (n - 1.0) + hit) / n;
        self.mean_latency_ms = (self.mean_latency_ms * (n - 1.0) + latency.as_secs_f64() * 1000.0) / n;
    }

    /// Mean latency as a duration.
    pub fn mean_latency(&self) -> Duration {
        Duration::from_secs_f64(self.mean_latency_ms.max(0.0) / 1000.0)
    }
}
