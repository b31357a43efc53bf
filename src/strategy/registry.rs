//! Startup-time mapping from a selector string to a strategy factory.

use std::collections::BTreeMap;

use super::builtin::{AcceptAllStrategy, FairStrategy, MidpointStrategy, MinimalStrategy, RandomStrategy};
use super::Strategy;
use crate::{BargainError, BargainResult};

pub type StrategyFactory = fn() -> Box<dyn Strategy>;

/// Registered strategies, keyed by selector
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    factories: BTreeMap<String, StrategyFactory>,
    aliases: BTreeMap<String, String>,
}

impl StrategyRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every strategy shipped with the client.
    ///
    /// The dotted class paths used by the first generation of agents are kept
    /// as aliases so existing `AGENT_CLS_PATH` values keep working.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("midpoint", || Box::new(MidpointStrategy));
        registry.register("fair", || Box::new(FairStrategy));
        registry.register("minimal", || Box::new(MinimalStrategy));
        registry.register("random", || Box::new(RandomStrategy));
        registry.register("accept-all", || Box::new(AcceptAllStrategy::default()));

        registry.alias("agent.dummy.DummyAgent", "midpoint");
        registry.alias("agent.fair.FairAgent", "fair");
        registry.alias("agent.cheater.CheaterAgent", "minimal");
        registry.alias("agent.chaotic.ChaoticAgent", "random");
        registry.alias("agent.my_agent.MyAgent", "accept-all");
        registry
    }

    /// Register (or replace) a factory under `selector`
    pub fn register(&mut self, selector: impl Into<String>, factory: StrategyFactory) -> &mut Self {
        self.factories.insert(selector.into(), factory);
        self
    }

    /// Make `alias` resolve to an already registered selector
    pub fn alias(&mut self, alias: impl Into<String>, selector: impl Into<String>) -> &mut Self {
        self.aliases.insert(alias.into(), selector.into());
        self
    }

    fn resolve<'a>(&'a self, selector: &'a str) -> &'a str {
        let selector = selector.trim();
        self.aliases.get(selector).map(String::as_str).unwrap_or(selector)
    }

    pub fn contains(&self, selector: &str) -> bool {
        self.factories.contains_key(self.resolve(selector))
    }

    /// Build a fresh strategy instance for `selector`
    pub fn create(&self, selector: &str) -> BargainResult<Box<dyn Strategy>> {
        let factory = self
            .factories
            .get(self.resolve(selector))
            .ok_or_else(|| BargainError::UnknownStrategy(selector.to_string()))?;
        Ok(factory())
    }

    /// Canonical selectors in sorted order
    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Aliases and the selector each resolves to
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, s)| (a.as_str(), s.as_str()))
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("selectors", &self.factories.keys().collect::<Vec<_>>())
            .field("aliases", &self.aliases)
            .finish()
    }
}
