//! Strategy registry.

use crate::error::{Result, ShadowError};
use crate::id::StrategyId;
use crate::strategy::{Strategy, StrategyStats};
use std::collections::HashMap;
use std::time::Duration;

/// Catalogue of known strategies and their running statistics.
///
/// Strategies are never removed; disabled ones stay for audit.
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<StrategyId, Strategy>,
    /// Registration order, for stable listings and tie-breaks
    order: Vec<StrategyId>,
}

impl StrategyRegistry {
    /// Create a new registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy. Statistics are reset to zero.
    pub fn register(&mut self, mut strategy: Strategy) -> Result<()> {
        if self.strategies.contains_key(&strategy.id) {
            return Err(ShadowError::DuplicateStrategy(strategy.id));
        }

        strategy.stats = StrategyStats::default();
        self.order.push(strategy.id.clone());
        self.strategies.insert(strategy.id.clone(), strategy);
        Ok(())
    }

    /// Get a strategy by ID.
    pub fn get(&self, id: &StrategyId) -> Option<&Strategy> {
        self.strategies.get(id)
    }

    /// Number of registered strategies.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All strategies, in registration order.
    pub fn list(&self) -> Vec<&Strategy> {
        self.order
            .iter()
            .filter_map(|id| self.strategies.get(id))
            .collect()
    }

    /// Snapshot of the enabled strategies - the fan-out set.
    pub fn list_enabled(&self) -> Vec<Strategy> {
        self.list()
            .into_iter()
            .filter(|s| s.enabled)
            .cloned()
            .collect()
    }

    /// Highest-scoring enabled strategy with at least `min_executions` samples.
    ///
    /// Equal scores are broken by success rate, then by registration order.
    pub fn best_by<F>(&self, min_executions: u64, score: F) -> Option<&Strategy>
    where
        F: Fn(&Strategy) -> f64,
    {
        let mut best: Option<(&Strategy, f64)> = None;
        for strategy in self.list() {
            if !strategy.enabled || strategy.stats.executions < min_executions {
                continue;
            }
            let value = score(strategy);
            match best {
                Some((top, top_value)) if !strategy.outranks(value, top, top_value) => {}
                _ => best = Some((strategy, value)),
            }
        }
        best.map(|(s, _)| s)
    }

    /// Flip the enabled flag, returning the previous value.
    pub fn set_enabled(&mut self, id: &StrategyId, enabled: bool) -> Result<bool> {
        let strategy = self
            .strategies
            .get_mut(id)
            .ok_or_else(|| ShadowError::StrategyNotFound(id.clone()))?;
        let previous = strategy.enabled;
        strategy.enabled = enabled;
        Ok(previous)
    }

    /// Sum of executions across all strategies.
    pub fn total_executions(&self) -> u64 {
        self.strategies.values().map(|s| s.stats.executions).sum()
    }

    /// Fold one execution result into a strategy's statistics.
    pub(crate) fn record(&mut self, id: &StrategyId, success: bool, latency: Duration) -> bool {
        match self.strategies.get_mut(id) {
            Some(strategy) => {
                strategy.stats.record(success, latency);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(id: &str, outcomes: &[bool]) -> Strategy {
        let mut s = Strategy::new(id, id, "v1");
        for &ok in outcomes {
            s.stats.record(ok, Duration::from_millis(10));
        }
        s
    }

    #[test]
    fn test_register_duplicate_fails() {
        let mut registry = StrategyRegistry::new();
        registry.register(Strategy::new("a", "A", "v1")).unwrap();

        let err = registry.register(Strategy::new("a", "A again", "v2")).unwrap_err();
        assert!(matches!(err, ShadowError::DuplicateStrategy(id) if id.as_str() == "a"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&"a".into()).unwrap().version, "v1");
    }

    #[test]
    fn test_register_zeroes_stats() {
        let mut registry = StrategyRegistry::new();
        registry.register(seeded("a", &[true, true])).unwrap();
        assert_eq!(registry.get(&"a".into()).unwrap().stats.executions, 0);
    }

    #[test]
    fn test_list_enabled_filters_disabled() {
        let mut registry = StrategyRegistry::new();
        registry.register(Strategy::new("a", "A", "v1")).unwrap();
        registry.register(Strategy::new("b", "B", "v1").disabled()).unwrap();
        registry.register(Strategy::new("c", "C", "v1")).unwrap();

        let ids: Vec<_> = registry.list_enabled().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![StrategyId::from("a"), StrategyId::from("c")]);
    }

    #[test]
    fn test_best_by_requires_min_executions() {
        let mut registry = StrategyRegistry::new();
        registry.register(Strategy::new("lucky", "Lucky", "v1")).unwrap();
        registry.register(Strategy::new("steady", "Steady", "v1")).unwrap();

        for _ in 0..2 {
            registry.record(&"lucky".into(), true, Duration::from_millis(10));
        }
        for i in 0..6 {
            registry.record(&"steady".into(), i != 0, Duration::from_millis(10));
        }

        let best = registry.best_by(5, |s| s.stats.success_rate).unwrap();
        assert_eq!(best.id.as_str(), "steady");
    }

    #[test]
    fn test_best_by_none_when_nobody_qualifies() {
        let mut registry = StrategyRegistry::new();
        registry.register(Strategy::new("a", "A", "v1")).unwrap();
        registry.record(&"a".into(), true, Duration::from_millis(1));
        assert!(registry.best_by(5, |s| s.score()).is_none());
    }

    #[test]
    fn test_best_by_breaks_score_ties_on_success_rate() {
        let mut registry = StrategyRegistry::new();
        registry.register(Strategy::new("broken", "Broken", "v1")).unwrap();
        registry.register(Strategy::new("reliable", "Reliable", "v1")).unwrap();
        for _ in 0..10 {
            registry.record(&"broken".into(), false, Duration::from_millis(2));
            registry.record(&"reliable".into(), true, Duration::from_millis(1500));
        }

        let best = registry.best_by(5, Strategy::score).unwrap();
        assert_eq!(best.id.as_str(), "reliable");
    }

    #[test]
    fn test_best_by_skips_disabled() {
        let mut registry = StrategyRegistry::new();
        registry.register(Strategy::new("a", "A", "v1")).unwrap();
        registry.register(Strategy::new("b", "B", "v1")).unwrap();
        for i in 0..10 {
            registry.record(&"a".into(), true, Duration::from_millis(10));
            registry.record(&"b".into(), i % 2 == 0, Duration::from_millis(10));
        }
        registry.set_enabled(&"a".into(), false).unwrap();

        assert_eq!(registry.best_by(5, Strategy::score).unwrap().id.as_str(), "b");
    }

    #[test]
    fn test_set_enabled_unknown() {
        let mut registry = StrategyRegistry::new();
        let err = registry.set_enabled(&"ghost".into(), true).unwrap_err();
        assert!(matches!(err, ShadowError::StrategyNotFound(_)));
    }
}
