//! Shadow fan-out - one concurrent attempt per enabled strategy.

use crate::task::{ShadowTask, TaskContext};
use shadow_core::{Execution, Result, ShadowError, SharedState, StrategyId, TaskId, Time};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Dispatches a task to every enabled strategy and collects the results.
///
/// Finished attempts are appended to the execution history and pushed onto
/// the evaluation queue. A full queue blocks the attempt that is enqueuing;
/// a closed queue drops the result silently.
#[derive(Clone)]
pub struct FanOut {
    state: SharedState,
    queue: mpsc::Sender<Execution>,
    attempt_timeout: Option<Duration>,
}

impl FanOut {
    /// Create a fan-out over the shared state, feeding `queue`.
    pub fn new(state: SharedState, queue: mpsc::Sender<Execution>) -> Self {
        Self {
            state,
            queue,
            attempt_timeout: None,
        }
    }

    /// Fail attempts that run longer than `timeout`.
    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Run `task` once per enabled strategy, concurrently.
    ///
    /// Blocks until every attempt has finished. Attempt failures are
    /// captured in the returned executions; the only error is
    /// [`ShadowError::NoEnabledStrategies`].
    pub async fn dispatch(
        &self,
        task_id: TaskId,
        primary_hint: Option<&StrategyId>,
        input: serde_json::Value,
        task: Arc<dyn ShadowTask>,
    ) -> Result<Vec<Execution>> {
        let strategies = self.state.read().await.registry.list_enabled();
        if strategies.is_empty() {
            warn!(task = %task_id, "Fan-out requested with no enabled strategies");
            return Err(ShadowError::NoEnabledStrategies);
        }

        info!(task = %task_id, attempts = strategies.len(), "Dispatching shadow batch");

        let input = Arc::new(input);
        let mut attempts = Vec::with_capacity(strategies.len());

        for strategy in strategies {
            let primary = primary_hint.is_some_and(|p| *p == strategy.id);
            let strategy_id = strategy.id.clone();
            let started_at = chrono::Utc::now();
            let ctx = TaskContext {
                task_id,
                strategy,
                primary,
                input: Arc::clone(&input),
            };

            let handle = tokio::spawn(run_attempt(
                self.clone(),
                Arc::clone(&task),
                ctx,
                started_at,
            ));
            attempts.push((strategy_id, primary, started_at, handle));
        }

        let mut executions = Vec::with_capacity(attempts.len());
        for (strategy_id, primary, started_at, handle) in attempts {
            let execution = match handle.await {
                Ok(execution) => execution,
                Err(e) => {
                    warn!(task = %task_id, strategy = %strategy_id, "Attempt aborted: {}", e);
                    let latency = (chrono::Utc::now() - started_at).to_std().unwrap_or_default();
                    let execution = Execution::failed(
                        task_id,
                        strategy_id,
                        primary,
                        started_at,
                        latency,
                        "task panicked",
                    );
                    self.finalize(execution.clone()).await;
                    execution
                }
            };
            executions.push(execution);
        }

        let succeeded = executions.iter().filter(|e| e.success).count();
        info!(
            task = %task_id,
            succeeded,
            failed = executions.len() - succeeded,
            "Shadow batch finished"
        );

        Ok(executions)
    }

    /// Record a finished attempt and hand it to the evaluation pipeline.
    async fn finalize(&self, execution: Execution) {
        self.state.write().await.record_history(execution.clone());

        if self.queue.send(execution).await.is_err() {
            debug!("Evaluation queue closed, result dropped");
        }
    }
}

async fn run_attempt(
    fanout: FanOut,
    task: Arc<dyn ShadowTask>,
    ctx: TaskContext,
    started_at: Time,
) -> Execution {
    let task_id = ctx.task_id;
    let strategy_id = ctx.strategy.id.clone();
    let primary = ctx.primary;
    let clock = Instant::now();

    let outcome = match fanout.attempt_timeout {
        Some(limit) => match tokio::time::timeout(limit, task.run(ctx)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(anyhow::anyhow!("timed out after {:?}", limit)),
        },
        None => task.run(ctx).await,
    };
    let elapsed = clock.elapsed();

    let execution = match outcome {
        Ok(mut metrics) => {
            if metrics.latency.is_zero() {
                metrics.latency = elapsed;
            }
            Execution::succeeded(task_id, strategy_id, primary, started_at, metrics)
        }
        Err(e) => Execution::failed(task_id, strategy_id, primary, started_at, elapsed, format!("{:#}", e)),
    };

    debug!(
        task = %execution.task_id,
        strategy = %execution.strategy_id,
        success = execution.success,
        latency_ms = execution.latency().as_millis() as u64,
        "Attempt finished"
    );

    fanout.finalize(execution.clone()).await;
    execution
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadow_core::{EngineState, Metrics, Strategy};
    use std::collections::HashSet;

    async fn setup(ids: &[&str]) -> (SharedState, FanOut, mpsc::Receiver<Execution>) {
        let state = EngineState::new(100).shared();
        {
            let mut guard = state.write().await;
            for id in ids {
                guard.registry.register(Strategy::new(*id, *id, "v1")).unwrap();
            }
        }
        let (tx, rx) = mpsc::channel(16);
        (state.clone(), FanOut::new(state, tx), rx)
    }

    fn echo() -> Arc<dyn ShadowTask> {
        Arc::new(|ctx: TaskContext| async move {
            anyhow::Ok(Metrics::new(ctx.strategy.id.to_string()).with_latency(Duration::from_millis(5)))
        })
    }

    #[tokio::test]
    async fn test_no_enabled_strategies() {
        let (state, fanout, _rx) = setup(&[]).await;
        state
            .write()
            .await
            .registry
            .register(Strategy::new("off", "Off", "v1").disabled())
            .unwrap();

        let err = fanout
            .dispatch(TaskId::new(), None, serde_json::Value::Null, echo())
            .await
            .unwrap_err();

        assert!(matches!(err, ShadowError::NoEnabledStrategies));
        assert_eq!(state.read().await.history_len(), 0);
    }

    #[tokio::test]
    async fn test_one_execution_per_enabled_strategy() {
        let (state, fanout, mut rx) = setup(&["a", "b", "c"]).await;
        let task_id = TaskId::new();
        let primary = StrategyId::from("b");

        let executions = fanout
            .dispatch(task_id, Some(&primary), serde_json::json!({"q": 1}), echo())
            .await
            .unwrap();

        assert_eq!(executions.len(), 3);
        let ids: HashSet<_> = executions.iter().map(|e| e.strategy_id.clone()).collect();
        assert_eq!(ids.len(), 3);
        assert!(executions.iter().all(|e| e.task_id == task_id && e.success));
        assert!(executions.iter().all(|e| e.primary == (e.strategy_id == primary)));

        assert_eq!(state.read().await.executions_for_task(task_id).len(), 3);
        let mut queued = 0;
        while rx.try_recv().is_ok() {
            queued += 1;
        }
        assert_eq!(queued, 3);
    }

    #[tokio::test]
    async fn test_failures_are_captured() {
        let (_state, fanout, _rx) = setup(&["good", "bad"]).await;
        let task: Arc<dyn ShadowTask> = Arc::new(|ctx: TaskContext| async move {
            if ctx.strategy.id.as_str() == "bad" {
                anyhow::bail!("provider unavailable");
            }
            Ok(Metrics::new("ok"))
        });

        let executions = fanout
            .dispatch(TaskId::new(), None, serde_json::Value::Null, task)
            .await
            .unwrap();

        let bad = executions.iter().find(|e| e.strategy_id.as_str() == "bad").unwrap();
        assert!(!bad.success);
        assert_eq!(bad.error.as_deref(), Some("provider unavailable"));
        assert!(bad.output.is_none());

        let good = executions.iter().find(|e| e.strategy_id.as_str() == "good").unwrap();
        assert!(good.success);
        assert_eq!(good.output.as_deref(), Some("ok"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout() {
        let (_state, fanout, _rx) = setup(&["slow"]).await;
        let fanout = fanout.with_attempt_timeout(Some(Duration::from_secs(1)));
        let task: Arc<dyn ShadowTask> = Arc::new(|_ctx: TaskContext| async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            anyhow::Ok(Metrics::new("late"))
        });

        let executions = fanout
            .dispatch(TaskId::new(), None, serde_json::Value::Null, task)
            .await
            .unwrap();

        assert_eq!(executions.len(), 1);
        assert!(!executions[0].success);
        assert!(executions[0].error.as_deref().unwrap().starts_with("timed out after"));
    }

    #[tokio::test]
    async fn test_panicking_task_still_recorded() {
        let (state, fanout, _rx) = setup(&["fragile", "solid"]).await;
        let task: Arc<dyn ShadowTask> = Arc::new(|ctx: TaskContext| async move {
            if ctx.strategy.id.as_str() == "fragile" {
                panic!("unexpected state");
            }
            anyhow::Ok(Metrics::new("fine"))
        });

        let executions = fanout
            .dispatch(TaskId::new(), None, serde_json::Value::Null, task)
            .await
            .unwrap();

        assert_eq!(executions.len(), 2);
        let fragile = executions.iter().find(|e| e.strategy_id.as_str() == "fragile").unwrap();
        assert_eq!(fragile.error.as_deref(), Some("task panicked"));
        assert_eq!(state.read().await.history_len(), 2);
    }

    #[tokio::test]
    async fn test_measured_latency_fills_unreported() {
        let (_state, fanout, _rx) = setup(&["a"]).await;
        let task: Arc<dyn ShadowTask> = Arc::new(|_ctx: TaskContext| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            anyhow::Ok(Metrics::new("x"))
        });

        let executions = fanout
            .dispatch(TaskId::new(), None, serde_json::Value::Null, task)
            .await
            .unwrap();

        assert!(executions[0].latency() >= Duration::from_millis(20));
    }
}
