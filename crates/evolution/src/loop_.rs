//! Evolution loop - periodic re-evaluation of the strategy catalogue.

use crate::optimizer::EvolutionOptimizer;
use shadow_core::{EvolutionEvent, SharedState};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Runs the optimizer on a fixed interval until cancelled.
///
/// Disabling is one-way: the loop never re-enables a strategy.
pub struct EvolutionLoop {
    state: SharedState,
    optimizer: EvolutionOptimizer,
    interval: Duration,
}

impl EvolutionLoop {
    /// Create a loop over the shared state.
    pub fn new(state: SharedState, optimizer: EvolutionOptimizer, interval: Duration) -> Self {
        Self {
            state,
            optimizer,
            interval,
        }
    }

    /// Tick every interval until `cancel` fires. The first tick happens one
    /// full interval after start.
    pub async fn run(self, cancel: CancellationToken) {
        info!(interval_ms = self.interval.as_millis() as u64, "Evolution loop started");

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }

        info!("Evolution loop stopped");
    }

    /// Evaluate once, returning the events produced.
    pub async fn tick(&self) -> Vec<EvolutionEvent> {
        let mut state = self.state.write().await;
        let events = self.optimizer.evolve(&mut state);
        debug!(changes = events.len(), "Evolution tick finished");
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadow_core::{EngineState, Execution, Metrics, Strategy, StrategyId, TaskId};

    async fn seeded_state() -> SharedState {
        let state = EngineState::new(64).shared();
        {
            let mut guard = state.write().await;
            guard.registry.register(Strategy::new("a", "A", "v1")).unwrap();
            guard.registry.register(Strategy::new("b", "B", "v1")).unwrap();
            for i in 0..20 {
                for (id, ok) in [("a", i != 0), ("b", i < 14)] {
                    let execution = if ok {
                        Execution::succeeded(
                            TaskId::new(),
                            StrategyId::from(id),
                            false,
                            chrono::Utc::now(),
                            Metrics::new("ok").with_latency(Duration::from_millis(50)),
                        )
                    } else {
                        Execution::failed(
                            TaskId::new(),
                            id.into(),
                            false,
                            chrono::Utc::now(),
                            Duration::from_millis(50),
                            "err",
                        )
                    };
                    guard.apply_execution(&execution);
                }
            }
        }
        state
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_ticks_on_interval() {
        let state = seeded_state().await;
        let cancel = CancellationToken::new();
        let evolution = EvolutionLoop::new(state.clone(), EvolutionOptimizer::new(), Duration::from_secs(30));
        let handle = tokio::spawn(evolution.run(cancel.clone()));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(state.read().await.events().is_empty());

        tokio::time::sleep(Duration::from_secs(25)).await;
        {
            let guard = state.read().await;
            assert_eq!(guard.events().len(), 1);
            assert!(!guard.registry.get(&"b".into()).unwrap().enabled);
        }

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_exits_promptly() {
        let state = EngineState::new(4).shared();
        let cancel = CancellationToken::new();
        let evolution = EvolutionLoop::new(state, EvolutionOptimizer::new(), Duration::from_secs(3600));
        let handle = tokio::spawn(evolution.run(cancel.clone()));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_tick_is_idempotent_after_disable() {
        let state = seeded_state().await;
        let evolution = EvolutionLoop::new(state, EvolutionOptimizer::new(), Duration::from_secs(30));

        assert_eq!(evolution.tick().await.len(), 1);
        assert!(evolution.tick().await.is_empty());
    }
}
