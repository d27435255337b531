//! Evolution event model - audit trail of automated decisions.

use crate::id::{EventId, StrategyId};
use crate::Time;
use serde::{Deserialize, Serialize};

/// Kind of automated change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Strategy disabled because it trails the reference
    DisabledUnderperforming,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::DisabledUnderperforming => write!(f, "disabled: underperforming"),
        }
    }
}

/// An immutable record of one decision taken by the evolution loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionEvent {
    /// Unique identifier
    pub id: EventId,

    /// When the decision was taken
    pub timestamp: Time,

    /// Affected strategy
    pub strategy_id: StrategyId,

    /// What changed
    pub kind: ChangeKind,

    /// Value before the change
    pub old_value: serde_json::Value,

    /// Value after the change
    pub new_value: serde_json::Value,

    /// Human-readable justification
    pub reason: String,

    /// Magnitude of the decision (success-rate gap for disables)
    pub impact: f64,
}

impl EvolutionEvent {
    /// Record that a strategy was disabled.
    pub fn disabled(strategy_id: StrategyId, reason: impl Into<String>, impact: f64) -> Self {
        Self {
            id: EventId::new(),
            timestamp: chrono::Utc::now(),
            strategy_id,
            kind: ChangeKind::DisabledUnderperforming,
            old_value: serde_json::json!({ "enabled": true }),
            new_value: serde_json::json!({ "enabled": false }),
            reason: reason.into(),
            impact,
        }
    }
}
