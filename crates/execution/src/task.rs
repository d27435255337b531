//! The task-function contract supplied by callers.

use async_trait::async_trait;
use shadow_core::{Metrics, Strategy, TaskId};
use std::future::Future;
use std::sync::Arc;

/// Everything one attempt gets to see.
#[derive(Debug, Clone)]
pub struct TaskContext {
    /// Parent task, shared by all sibling attempts
    pub task_id: TaskId,

    /// Snapshot of the strategy being exercised
    pub strategy: Strategy,

    /// Whether this strategy is the batch's primary
    pub primary: bool,

    /// Opaque input shared by every attempt
    pub input: Arc<serde_json::Value>,
}

/// The work performed under a strategy.
///
/// The engine never looks inside the output; it only reads the numeric
/// fields of the returned [`Metrics`]. Errors are opaque and end up as text
/// in the failed `Execution`.
#[async_trait]
pub trait ShadowTask: Send + Sync {
    /// Run one attempt.
    async fn run(&self, ctx: TaskContext) -> anyhow::Result<Metrics>;
}

#[async_trait]
impl<F, Fut> ShadowTask for F
where
    F: Fn(TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Metrics>> + Send + 'static,
{
    async fn run(&self, ctx: TaskContext) -> anyhow::Result<Metrics> {
        (self)(ctx).await
    }
}
