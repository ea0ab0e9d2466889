//! Component registry.
//!
//! Maps the `component` tag found in agent and environment parameters to a
//! constructor. The registry is filled once at startup; graph managers look
//! tags up in it when they build a hierarchy.

use std::collections::BTreeMap;

use hac_types::{EnvironmentParameters, LevelParameters, SpacesDefinition, VisualizationParameters};
use tracing::warn;

use crate::agent::Agent;
use crate::builtins::{ChainEnvironment, RandomAgent};
use crate::environment::Environment;
use crate::error::{ComponentKind, ComponentResult, HacError};

/// Builds an environment from its parameters.
pub type EnvironmentFactory = Box<
    dyn Fn(&EnvironmentParameters, &VisualizationParameters) -> ComponentResult<Box<dyn Environment>>,
>;

/// Builds an agent for one level, given the spaces of what it controls.
pub type AgentFactory =
    Box<dyn Fn(&LevelParameters, &SpacesDefinition) -> ComponentResult<Box<dyn Agent>>>;

/// Tag-to-constructor tables for agents and environments.
#[derive(Default)]
pub struct ComponentRegistry {
    environments: BTreeMap<String, EnvironmentFactory>,
    agents: BTreeMap<String, AgentFactory>,
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("environments", &self.environment_tags())
            .field("agents", &self.agent_tags())
            .finish()
    }
}

impl ComponentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in `chain` environment and
    /// `random` agent.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_environment(ChainEnvironment::TAG, |params, _vis| {
            Ok(Box::new(ChainEnvironment::from_parameters(params)?))
        });
        registry.register_agent(RandomAgent::TAG, |params, spaces| {
            Ok(Box::new(RandomAgent::new(params, spaces)))
        });
        registry
    }

    /// Registers an environment constructor, replacing any earlier one.
    pub fn register_environment<F>(&mut self, tag: impl Into<String>, factory: F)
    where
        F: Fn(&EnvironmentParameters, &VisualizationParameters) -> ComponentResult<Box<dyn Environment>>
            + 'static,
    {
        let tag = tag.into();
        if self.environments.contains_key(&tag) {
            warn!("Replacing environment constructor registered under '{}'", tag);
        }
        self.environments.insert(tag, Box::new(factory));
    }

    /// Registers an agent constructor, replacing any earlier one.
    pub fn register_agent<F>(&mut self, tag: impl Into<String>, factory: F)
    where
        F: Fn(&LevelParameters, &SpacesDefinition) -> ComponentResult<Box<dyn Agent>> + 'static,
    {
        let tag = tag.into();
        if self.agents.contains_key(&tag) {
            warn!("Replacing agent constructor registered under '{}'", tag);
        }
        self.agents.insert(tag, Box::new(factory));
    }

    /// Instantiates the environment named by `params.component`.
    pub fn create_environment(
        &self,
        params: &EnvironmentParameters,
        visualization: &VisualizationParameters,
    ) -> Result<Box<dyn Environment>, HacError> {
        let factory = self.environments.get(&params.component).ok_or_else(|| {
            HacError::UnknownComponent {
                kind: ComponentKind::Environment,
                tag: params.component.clone(),
                known: self.environment_tags().join(", "),
            }
        })?;
        factory(params, visualization).map_err(HacError::Component)
    }

    /// Instantiates the agent named by `params.component`.
    pub fn create_agent(
        &self,
        params: &LevelParameters,
        spaces: &SpacesDefinition,
    ) -> Result<Box<dyn Agent>, HacError> {
        let factory = self.agents.get(&params.component).ok_or_else(|| HacError::UnknownComponent {
            kind: ComponentKind::Agent,
            tag: params.component.clone(),
            known: self.agent_tags().join(", "),
        })?;
        factory(params, spaces).map_err(HacError::Component)
    }

    /// Registered environment tags, sorted.
    pub fn environment_tags(&self) -> Vec<&str> {
        self.environments.keys().map(String::as_str).collect()
    }

    /// Registered agent tags, sorted.
    pub fn agent_tags(&self) -> Vec<&str> {
        self.agents.keys().map(String::as_str).collect()
    }
}
