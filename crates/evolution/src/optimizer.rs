//! Evolution optimizer - decides which strategies to disable.

use shadow_core::{EngineState, EvolutionEvent, ShadowConfig, Strategy, StrategyId, StrategyRegistry};
use tracing::{debug, info, warn};

/// A decision to disable one strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyAdjustment {
    /// Strategy to disable
    pub strategy_id: StrategyId,
    /// Why it is being disabled
    pub reason: String,
    /// Success-rate gap to the reference strategy
    pub impact: f64,
}

/// Compares strategies and picks persistent under-performers.
#[derive(Debug, Clone)]
pub struct EvolutionOptimizer {
    min_total_executions: u64,
    min_strategy_executions: u64,
    disable_margin: f64,
}

impl EvolutionOptimizer {
    /// Create an optimizer with the default thresholds.
    pub fn new() -> Self {
        Self::from_config(&ShadowConfig::default())
    }

    /// Create an optimizer from engine configuration.
    pub fn from_config(config: &ShadowConfig) -> Self {
        Self {
            min_total_executions: config.min_total_executions,
            min_strategy_executions: config.min_strategy_executions,
            disable_margin: config.disable_margin,
        }
    }

    /// Pick the reference strategy: the best combined score among enabled
    /// strategies with enough samples, the same choice as `best_strategy`.
    ///
    /// A disabled strategy never serves as reference, so at least the
    /// reference itself stays enabled after a round.
    pub fn reference<'a>(&self, registry: &'a StrategyRegistry) -> Option<&'a Strategy> {
        registry.best_by(self.min_strategy_executions, Strategy::score)
    }

    /// Analyze the registry and suggest disables.
    pub fn suggest_adjustments(&self, registry: &StrategyRegistry) -> Vec<StrategyAdjustment> {
        let total = registry.total_executions();
        if total < self.min_total_executions {
            debug!(total, required = self.min_total_executions, "Not enough executions, skipping evolution");
            return Vec::new();
        }

        let Some(reference) = self.reference(registry) else {
            debug!("No strategy has enough samples to serve as reference");
            return Vec::new();
        };

        registry
            .list()
            .into_iter()
            .filter(|s| s.enabled && s.id != reference.id)
            .filter(|s| s.stats.executions >= self.min_strategy_executions)
            .filter_map(|s| {
                let gap = reference.stats.success_rate - s.stats.success_rate;
                (gap > self.disable_margin).then(|| StrategyAdjustment {
                    strategy_id: s.id.clone(),
                    reason: format!(
                        "success rate {:.0}% trails '{}' ({:.0}%) by {:.0} points, margin is {:.0}",
                        s.stats.success_rate * 100.0,
                        reference.id,
                        reference.stats.success_rate * 100.0,
                        gap * 100.0,
                        self.disable_margin * 100.0,
                    ),
                    impact: gap,
                })
            })
            .collect()
    }

    /// Disable the suggested strategies and record one event per change.
    pub fn apply_adjustments(
        &self,
        state: &mut EngineState,
        adjustments: &[StrategyAdjustment],
    ) -> Vec<EvolutionEvent> {
        let mut events = Vec::new();

        for adjustment in adjustments {
            match state.registry.set_enabled(&adjustment.strategy_id, false) {
                Ok(true) => {
                    info!(
                        strategy = %adjustment.strategy_id,
                        impact = adjustment.impact,
                        "Disabling strategy: {}",
                        adjustment.reason
                    );
                    let event = EvolutionEvent::disabled(
                        adjustment.strategy_id.clone(),
                        adjustment.reason.clone(),
                        adjustment.impact,
                    );
                    state.push_event(event.clone());
                    events.push(event);
                }
                Ok(false) => {}
                Err(e) => warn!("Skipping adjustment: {}", e),
            }
        }

        events
    }

    /// One full evaluation round over the state.
    pub fn evolve(&self, state: &mut EngineState) -> Vec<EvolutionEvent> {
        let adjustments = self.suggest_adjustments(&state.registry);
        if adjustments.is_empty() {
            return Vec::new();
        }
        self.apply_adjustments(state, &adjustments)
    }
}

impl Default for EvolutionOptimizer {
    fn default() -> Self {
        Self::new()
    }
}
