//! Agent registry keyed by contract address.

use std::collections::BTreeMap;

use crate::agent::Agent;
use crate::error::{HighlightError, Result};

/// Builds a fresh [`Agent`] for every message.
pub type AgentFactory = Box<dyn Fn() -> Result<Agent> + Send + Sync>;

/// Maps `verifyingContract` addresses to agent factories.
///
/// Addresses are matched case-insensitively. The registry is built once at
/// startup and handed to [`Highlight`](crate::Highlight).
#[derive(Default)]
pub struct AgentRegistry {
    factories: BTreeMap<String, AgentFactory>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` at `address`, replacing any previous one.
    pub fn register<F>(&mut self, address: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Result<Agent> + Send + Sync + 'static,
    {
        self.factories
            .insert(address.to_lowercase(), Box::new(factory));
        self
    }

    pub fn contains(&self, address: &str) -> bool {
        self.factories.contains_key(&address.to_lowercase())
    }

    /// Registered addresses, lower-cased.
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// A new agent instance for `address`.
    pub fn resolve(&self, address: &str) -> Result<Agent> {
        let factory = self
            .factories
            .get(&address.to_lowercase())
            .ok_or_else(|| HighlightError::AgentNotFound(address.to_string()))?;
        factory()
    }
}
