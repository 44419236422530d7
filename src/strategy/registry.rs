use super::toolchains::{self, DetectOptions, Detection, Strategy};
use super::StrategyId;
use crate::project::Project;
use std::sync::Arc;

/// Strategies in the order they are consulted
pub struct StrategyRegistry {
    strategies: Vec<Arc<Strategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for strategy in toolchains::default_strategies() {
            registry.register(strategy);
        }
        registry
    }

    /// Only the listed strategies, kept in the order given
    pub fn with_strategies(ids: &[StrategyId]) -> Self {
        let mut registry = Self::new();
        for id in ids {
            registry.register(toolchains::strategy(*id));
        }
        registry
    }

    /// Append `strategy` at the lowest priority; replaces an existing entry with the same id
    pub fn register(&mut self, strategy: Strategy) {
        self.strategies.retain(|s| s.id() != strategy.id());
        self.strategies.push(Arc::new(strategy));
    }

    pub fn get(&self, id: StrategyId) -> Option<Arc<Strategy>> {
        self.strategies.iter().find(|s| s.id() == id).cloned()
    }

    pub fn strategies(&self) -> &[Arc<Strategy>] {
        &self.strategies
    }

    pub fn ids(&self) -> Vec<StrategyId> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    /// Every applicable strategy for `project`, highest priority first
    pub fn detect_all(
        &self,
        project: &Project,
        options: &DetectOptions,
    ) -> Vec<(Arc<Strategy>, Detection)> {
        self.strategies
            .iter()
            .filter_map(|s| s.detect(project, options).map(|d| (Arc::clone(s), d)))
            .collect()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
