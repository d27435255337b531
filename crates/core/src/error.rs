//! Error types shared across the engine.

use crate::id::StrategyId;

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, ShadowError>;

/// Errors surfaced synchronously to callers.
///
/// Task failures are never represented here; they are captured in the
/// corresponding `Execution`.
#[derive(Debug, thiserror::Error)]
pub enum ShadowError {
    /// A strategy with this identifier is already registered
    #[error("strategy already registered: {0}")]
    DuplicateStrategy(StrategyId),

    /// Fan-out was requested while no strategy is enabled
    #[error("no enabled strategies")]
    NoEnabledStrategies,

    /// No strategy with this identifier
    #[error("strategy not found: {0}")]
    StrategyNotFound(StrategyId),

    /// Start was called while the background loops are running
    #[error("manager already running")]
    AlreadyRunning,

    /// Start was called after the manager was stopped
    #[error("manager stopped; create a new one to restart")]
    AlreadyStopped,

    /// I/O error while loading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
