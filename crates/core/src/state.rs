//! Shared engine state: registry, bounded execution history, evolution log.

use crate::event::EvolutionEvent;
use crate::execution::Execution;
use crate::id::TaskId;
use crate::registry::StrategyRegistry;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// State guarded by the manager's single reader/writer lock.
pub type SharedState = Arc<RwLock<EngineState>>;

/// Everything the engine mutates.
#[derive(Debug)]
pub struct EngineState {
    /// Strategy catalogue and statistics
    pub registry: StrategyRegistry,
    history: VecDeque<Execution>,
    history_capacity: usize,
    events: Vec<EvolutionEvent>,
    evaluated: u64,
    successes: u64,
}

impl EngineState {
    /// Create empty state retaining at most `history_capacity` executions.
    pub fn new(history_capacity: usize) -> Self {
        Self {
            registry: StrategyRegistry::new(),
            history: VecDeque::with_capacity(history_capacity.min(1024)),
            history_capacity,
            events: Vec::new(),
            evaluated: 0,
            successes: 0,
        }
    }

    /// Wrap into the shared, lock-guarded form.
    pub fn shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }

    /// Fold a completed execution into its strategy's statistics.
    ///
    /// Only the evaluation pipeline calls this. Returns `false` when the
    /// strategy is unknown and nothing was updated.
    pub fn apply_execution(&mut self, execution: &Execution) -> bool {
        let applied = self.registry.record(
            &execution.strategy_id,
            execution.success,
            execution.latency(),
        );
        if applied {
            self.evaluated += 1;
            if execution.success {
                self.successes += 1;
            }
        }
        applied
    }

    /// Append to the bounded history, evicting the oldest entry when full.
    pub fn record_history(&mut self, execution: Execution) {
        if self.history_capacity == 0 {
            return;
        }
        while self.history.len() >= self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(execution);
    }

    /// Append an evolution event.
    pub fn push_event(&mut self, event: EvolutionEvent) {
        self.events.push(event);
    }

    /// Evolution events in append order.
    pub fn events(&self) -> &[EvolutionEvent] {
        &self.events
    }

    /// Number of retained executions.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Retained executions of one task.
    pub fn executions_for_task(&self, task_id: TaskId) -> Vec<Execution> {
        self.history
            .iter()
            .filter(|e| e.task_id == task_id)
            .cloned()
            .collect()
    }

    /// The `limit` most recent executions, newest first.
    pub fn recent_executions(&self, limit: usize) -> Vec<Execution> {
        self.history.iter().rev().take(limit).cloned().collect()
    }

    /// Executions folded in by the pipeline.
    pub fn evaluated(&self) -> u64 {
        self.evaluated
    }

    /// Successful executions folded in by the pipeline.
    pub fn successes(&self) -> u64 {
        self.successes
    }
}
