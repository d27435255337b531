//! Evaluation pipeline - the single consumer of finished attempts.

use shadow_core::{Execution, SharedState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Folds finished executions into strategy statistics, one at a time.
///
/// Being the only writer of statistics, it needs no per-strategy locking;
/// it holds the shared write lock just for the in-memory update.
pub struct EvaluationPipeline {
    state: SharedState,
    queue: mpsc::Receiver<Execution>,
}

impl EvaluationPipeline {
    /// Create a pipeline draining `queue`.
    pub fn new(state: SharedState, queue: mpsc::Receiver<Execution>) -> Self {
        Self { state, queue }
    }

    /// Drain the queue in arrival order until cancelled or every sender is gone.
    ///
    /// Returns the number of executions evaluated. The queue is closed on
    /// exit, so later sends fail instead of piling up.
    pub async fn run(mut self, cancel: CancellationToken) -> u64 {
        info!("Evaluation pipeline started");
        let mut processed = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = self.queue.recv() => match next {
                    Some(execution) => {
                        if self.evaluate(&execution).await {
                            processed += 1;
                        }
                    }
                    None => break,
                },
            }
        }

        self.queue.close();
        info!(processed, "Evaluation pipeline stopped");
        processed
    }

    /// Apply one execution. Returns `false` if its strategy is unknown.
    pub async fn evaluate(&self, execution: &Execution) -> bool {
        let mut state = self.state.write().await;
        if !state.apply_execution(execution) {
            warn!(strategy = %execution.strategy_id, "Execution for unknown strategy ignored");
            return false;
        }

        if let Some(strategy) = state.registry.get(&execution.strategy_id) {
            debug!(
                strategy = %strategy.id,
                executions = strategy.stats.executions,
                success_rate = strategy.stats.success_rate,
                mean_latency_ms = strategy.stats.mean_latency_ms,
                "Statistics updated"
            );
        }
        true
    }
}
