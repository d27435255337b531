//! Shadow manager - the facade over registry, fan-out, pipeline and evolution.

use crate::lifecycle::{Lifecycle, ManagerStatus, Workers};
use shadow_core::{
    EngineState, Execution, EvolutionEvent, Result, ShadowConfig, ShadowError, SharedState,
    Strategy, StrategyId, TaskId,
};
use shadow_evolution::{EngineMetrics, EvaluationPipeline, EvolutionLoop, EvolutionOptimizer};
use shadow_execution::{FanOut, ShadowTask};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Owns the strategy registry, execution history and evolution log, and
/// the two background loops that keep them current.
///
/// ```text
/// execute_shadow → N attempts → queue → pipeline → registry ← evolution loop
/// ```
///
/// Results produced before [`start`](Self::start) wait in the bounded queue;
/// once it is full, fan-out blocks until the pipeline runs. After
/// [`stop`](Self::stop) the registry stays readable and fan-out still runs,
/// but results are no longer evaluated.
pub struct ShadowManager {
    config: ShadowConfig,
    state: SharedState,
    fanout: FanOut,
    optimizer: EvolutionOptimizer,
    lifecycle: Mutex<Lifecycle>,
}

impl ShadowManager {
    /// Create a stopped manager.
    pub fn new(config: ShadowConfig) -> Self {
        let state = EngineState::new(config.history_capacity).shared();
        let (tx, rx) = mpsc::channel(config.queue_capacity());
        let fanout = FanOut::new(state.clone(), tx).with_attempt_timeout(config.attempt_timeout());
        let optimizer = EvolutionOptimizer::from_config(&config);

        Self {
            config,
            state,
            fanout,
            optimizer,
            lifecycle: Mutex::new(Lifecycle::Created(rx)),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ShadowConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub async fn status(&self) -> ManagerStatus {
        self.lifecycle.lock().await.status()
    }

    /// Spawn the evaluation pipeline and the evolution loop.
    ///
    /// Must be called from within a Tokio runtime. Fails if already running
    /// or already stopped.
    pub async fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        let queue = match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Created(queue) => queue,
            Lifecycle::Running(workers) => {
                *lifecycle = Lifecycle::Running(workers);
                return Err(ShadowError::AlreadyRunning);
            }
            Lifecycle::Stopped => return Err(ShadowError::AlreadyStopped),
        };

        let cancel = CancellationToken::new();
        let pipeline = EvaluationPipeline::new(self.state.clone(), queue);
        let evolution = EvolutionLoop::new(
            self.state.clone(),
            self.optimizer.clone(),
            self.config.evolution_interval(),
        );

        *lifecycle = Lifecycle::Running(Workers {
            pipeline: tokio::spawn(pipeline.run(cancel.clone())),
            evolution: tokio::spawn(evolution.run(cancel.clone())),
            cancel,
        });

        info!("Shadow manager started");
        Ok(())
    }

    /// Cancel both loops, close the evaluation queue and wait for the loops
    /// to exit. In-flight fan-out attempts are not cancelled; their results
    /// are dropped.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Running(workers) => {
                let processed = workers.shutdown().await;
                info!(processed, "Shadow manager stopped");
            }
            Lifecycle::Created(queue) => {
                drop(queue);
                info!("Shadow manager stopped before start");
            }
            Lifecycle::Stopped => {}
        }
    }

    /// Register a new strategy with zeroed statistics.
    pub async fn register_strategy(&self, strategy: Strategy) -> Result<()> {
        let id = strategy.id.clone();
        self.state.write().await.registry.register(strategy)?;
        info!(strategy = %id, "Strategy registered");
        Ok(())
    }

    /// Re-enable a strategy. Never done automatically.
    pub async fn enable_strategy(&self, id: &StrategyId) -> Result<()> {
        let previous = self.state.write().await.registry.set_enabled(id, true)?;
        if !previous {
            info!(strategy = %id, "Strategy enabled");
        }
        Ok(())
    }

    /// Disable a strategy by hand. Does not produce an evolution event.
    pub async fn disable_strategy(&self, id: &StrategyId) -> Result<()> {
        let previous = self.state.write().await.registry.set_enabled(id, false)?;
        if previous {
            info!(strategy = %id, "Strategy disabled");
        }
        Ok(())
    }

    /// Snapshot of one strategy.
    pub async fn strategy(&self, id: &StrategyId) -> Option<Strategy> {
        self.state.read().await.registry.get(id).cloned()
    }

    /// Snapshot of all strategies, in registration order.
    pub async fn strategies(&self) -> Vec<Strategy> {
        self.state
            .read()
            .await
            .registry
            .list()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Run `task` under every enabled strategy in parallel.
    ///
    /// Waits for every attempt. Fails only with
    /// [`ShadowError::NoEnabledStrategies`].
    pub async fn execute_shadow(
        &self,
        task_id: TaskId,
        primary_hint: Option<&StrategyId>,
        input: serde_json::Value,
        task: Arc<dyn ShadowTask>,
    ) -> Result<Vec<Execution>> {
        self.fanout.dispatch(task_id, primary_hint, input, task).await
    }

    /// Best enabled strategy by combined score, among those with enough
    /// executions to be trusted.
    pub async fn best_strategy(&self) -> Option<Strategy> {
        self.state
            .read()
            .await
            .registry
            .best_by(self.config.min_strategy_executions, Strategy::score)
            .cloned()
    }

    /// Every evolution event, in the order it was recorded.
    pub async fn evolution_history(&self) -> Vec<EvolutionEvent> {
        self.state.read().await.events().to_vec()
    }

    /// Run one evolution round now, outside the timer.
    pub async fn evolve_now(&self) -> Vec<EvolutionEvent> {
        let mut state = self.state.write().await;
        self.optimizer.evolve(&mut state)
    }

    /// Aggregate counts for reporting.
    pub async fn metrics(&self) -> EngineMetrics {
        EngineMetrics::collect(&*self.state.read().await)
    }

    /// Retained executions of one task.
    pub async fn executions(&self, task_id: TaskId) -> Vec<Execution> {
        self.state.read().await.executions_for_task(task_id)
    }

    /// The most recent retained executions, newest first.
    pub async fn recent_executions(&self, limit: usize) -> Vec<Execution> {
        self.state.read().await.recent_executions(limit)
    }
}

impl Default for ShadowManager {
    fn default() -> Self {
        Self::new(ShadowConfig::default())
    }
}

impl Drop for ShadowManager {
    fn drop(&mut self) {
        if let Lifecycle::Running(workers) = self.lifecycle.get_mut() {
            workers.cancel.cancel();
        }
    }
}
