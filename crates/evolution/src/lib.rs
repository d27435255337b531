//! Evolution layer - evaluation of finished attempts and strategy selection.

#![warn(missing_docs, unused_crate_dependencies)]

mod pipeline;
mod optimizer;
mod loop_;
mod metrics;
mod comparison;

pub use pipeline::EvaluationPipeline;
pub use optimizer::{EvolutionOptimizer, StrategyAdjustment};
pub use loop_::EvolutionLoop;
pub use metrics::{EngineMetrics, StrategySummary};
pub use comparison::{
    compare, diff_preview, ApprovalGate, ComparisonThresholds, RiskLevel, ShadowReview,
    UpgradeOutcome, Verdict,
};
