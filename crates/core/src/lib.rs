//! Shadow core data models.
//!
//! Strategies, executions, evolution events, the strategy registry and the
//! lock-guarded state shared by the fan-out, the evaluation pipeline and
//! the evolution loop.

#![warn(missing_docs)]

mod id;
mod config;
mod error;

mod strategy;
mod execution;
mod event;

mod registry;
mod state;

pub use id::{StrategyId, TaskId, ExecutionId, EventId};
pub use config::ShadowConfig;
pub use error::{ShadowError, Result};

pub use strategy::{Strategy, StrategyStats};
pub use execution::{Execution, Metrics};
pub use event::{EvolutionEvent, ChangeKind};

pub use registry::StrategyRegistry;
pub use state::{EngineState, SharedState};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
