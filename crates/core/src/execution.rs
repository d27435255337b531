//! Execution model - one attempt of a task under one strategy.

use crate::id::{ExecutionId, StrategyId, TaskId};
use crate::Time;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Performance figures reported for one attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Wall-clock latency
    pub latency: Duration,

    /// Resource cost in an abstract unit (dollars, credits, ...)
    pub cost: f64,

    /// Quality score, 0.0..=1.0
    pub quality: f64,

    /// Tokens consumed
    pub tokens: u64,

    /// Number of sub-calls made (tool calls, model calls)
    pub sub_calls: u32,

    /// Additional named counters
    pub counters: HashMap<String, u64>,

    /// Opaque output produced by the task
    pub output: String,
}

impl Metrics {
    /// Create metrics carrying an output.
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            ..Default::default()
        }
    }

    /// Set latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Set cost.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    /// Set quality score.
    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality = quality;
        self
    }

    /// Set token count.
    pub fn with_tokens(mut self, tokens: u64) -> Self {
        self.tokens = tokens;
        self
    }

    /// Increment a named counter.
    pub fn count(mut self, name: impl Into<String>, by: u64) -> Self {
        *self.counters.entry(name.into()).or_default() += by;
        self
    }
}

/// A finalized attempt. Built once, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    /// Unique identifier
    pub id: ExecutionId,

    /// Strategy that ran this attempt
    pub strategy_id: StrategyId,

    /// Parent task, shared by all sibling attempts
    pub task_id: TaskId,

    /// Whether the strategy was the batch's primary
    pub primary: bool,

    /// Dispatch time
    pub started_at: Time,

    /// Completion time
    pub finished_at: Time,

    /// Whether the task function returned successfully
    pub success: bool,

    /// Result payload on success
    pub output: Option<String>,

    /// Error text on failure
    pub error: Option<String>,

    /// Metrics snapshot
    pub metrics: Metrics,
}

impl Execution {
    /// Finalize a successful attempt.
    pub fn succeeded(
        task_id: TaskId,
        strategy_id: StrategyId,
        primary: bool,
        started_at: Time,
        metrics: Metrics,
    ) -> Self {
        Self {
            id: ExecutionId::new(),
            strategy_id,
            task_id,
            primary,
            started_at,
            finished_at: chrono::Utc::now(),
            success: true,
            output: Some(metrics.output.clone()),
            error: None,
            metrics,
        }
    }

    /// Finalize a failed attempt.
    pub fn failed(
        task_id: TaskId,
        strategy_id: StrategyId,
        primary: bool,
        started_at: Time,
        latency: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: ExecutionId::new(),
            strategy_id,
            task_id,
            primary,
            started_at,
            finished_at: chrono::Utc::now(),
            success: false,
            output: None,
            error: Some(error.into()),
            metrics: Metrics::default().with_latency(latency),
        }
    }

    /// Latency used for statistics.
    pub fn latency(&self) -> Duration {
        self.metrics.latency
    }
}
