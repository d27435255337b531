//! Aggregate metrics for external reporting.

use serde::{Deserialize, Serialize};
use shadow_core::{EngineState, StrategyId};

/// Per-strategy summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySummary {
    /// Strategy identifier
    pub id: StrategyId,
    /// Version tag
    pub version: String,
    /// Whether the strategy is enabled
    pub enabled: bool,
    /// Executions evaluated
    pub executions: u64,
    /// Success rate, 0.0..=1.0
    pub success_rate: f64,
    /// Mean latency (milliseconds)
    pub mean_latency_ms: f64,
    /// Combined score
    pub score: f64,
}

/// Overall engine metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineMetrics {
    /// Registered strategies
    pub strategies_total: usize,
    /// Enabled strategies
    pub strategies_enabled: usize,
    /// Disabled strategies
    pub strategies_disabled: usize,
    /// Executions folded in by the evaluation pipeline
    pub executions_evaluated: u64,
    /// Successful executions
    pub successes: u64,
    /// Failed executions
    pub failures: u64,
    /// Overall success rate
    pub success_rate: f64,
    /// Executions currently retained in history
    pub history_len: usize,
    /// Evolution events recorded
    pub evolution_events: usize,
    /// Per-strategy breakdown, in registration order
    pub strategies: Vec<StrategySummary>,
}

impl EngineMetrics {
    /// Snapshot the engine state.
    pub fn collect(state: &EngineState) -> Self {
        let strategies: Vec<_> = state
            .registry
            .list()
            .into_iter()
            .map(|s| StrategySummary {
                id: s.id.clone(),
                version: s.version.clone(),
                enabled: s.enabled,
                executions: s.stats.executions,
                success_rate: s.stats.success_rate,
                mean_latency_ms: s.stats.mean_latency_ms,
                score: s.score(),
            })
            .collect();

        let enabled = strategies.iter().filter(|s| s.enabled).count();
        let evaluated = state.evaluated();
        let successes = state.successes();

        Self {
            strategies_total: strategies.len(),
            strategies_enabled: enabled,
            strategies_disabled: strategies.len() - enabled,
            executions_evaluated: evaluated,
            successes,
            failures: evaluated - successes,
            success_rate: if evaluated == 0 {
                0.0
            } else {
                successes as f64 / evaluated as f64
            },
            history_len: state.history_len(),
            evolution_events: state.events().len(),
            strategies,
        }
    }
}
