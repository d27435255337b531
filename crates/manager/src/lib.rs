//! Shadow manager - lifecycle and the public facade of the engine.

#![warn(missing_docs)]

mod lifecycle;
pub mod manager;

pub use lifecycle::ManagerStatus;
pub use manager::ShadowManager;

pub use shadow_core::{
    ChangeKind, Execution, EvolutionEvent, Metrics, Result, ShadowConfig, ShadowError, Strategy,
    StrategyId, StrategyStats, TaskId,
};
pub use shadow_evolution::{
    ApprovalGate, EngineMetrics, RiskLevel, ShadowReview, StrategySummary, UpgradeOutcome, Verdict,
};
pub use shadow_execution::{ShadowTask, TaskContext};
