//! Environment interface.
//!
//! Anything an agent can act on implements [`Environment`]: the real
//! simulation at the bottom of a hierarchy, and every [`LevelManager`] above it.
//!
//! [`LevelManager`]: crate::LevelManager

use std::cell::RefCell;
use std::rc::Rc;

use hac_types::{Action, Observation, Space, SpacesDefinition};

use crate::error::ComponentResult;

/// Outcome of a single environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvResponse {
    /// Observation after the step
    pub observation: Observation,
    /// Reward collected by the step
    pub reward: f64,
    /// Episode has ended
    pub done: bool,
}

impl EnvResponse {
    /// Creates a response that does not end the episode.
    pub fn running(observation: Observation, reward: f64) -> Self {
        Self { observation, reward, done: false }
    }
}

/// An environment in the gym sense: reset, then step until done.
pub trait Environment {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Space of observations this environment produces.
    fn observation_space(&self) -> Space;

    /// Space of actions this environment accepts.
    fn action_space(&self) -> Space;

    /// Starts a new episode and returns its first observation.
    fn reset(&mut self) -> ComponentResult<Observation>;

    /// Applies one action.
    fn step(&mut self, action: &Action) -> ComponentResult<EnvResponse>;

    /// Text rendering of the current state, if the environment has one.
    fn render(&self) -> Option<String> {
        None
    }

    /// Spaces an agent attached to this environment works with.
    fn spaces(&self) -> SpacesDefinition {
        SpacesDefinition::for_environment(self.observation_space(), self.action_space())
    }
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn observation_space(&self) -> Space {
        (**self).observation_space()
    }

    fn action_space(&self) -> Space {
        (**self).action_space()
    }

    fn reset(&mut self) -> ComponentResult<Observation> {
        (**self).reset()
    }

    fn step(&mut self, action: &Action) -> ComponentResult<EnvResponse> {
        (**self).step(action)
    }

    fn render(&self) -> Option<String> {
        (**self).render()
    }

    fn spaces(&self) -> SpacesDefinition {
        (**self).spaces()
    }
}

/// Shared handle to an environment.
///
/// The root environment is referenced by every level of a hierarchy, and each
/// level manager is referenced both by the level above and by the graph.
pub type EnvHandle = Rc<RefCell<dyn Environment>>;

/// Wraps a boxed environment into a shareable handle.
pub fn share(env: Box<dyn Environment>) -> EnvHandle {
    Rc::new(RefCell::new(env))
}

/// Returns true if both handles point at the same environment instance.
pub fn same_instance(a: &EnvHandle, b: &EnvHandle) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}
