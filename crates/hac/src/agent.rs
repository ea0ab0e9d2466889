//! Agent interface.
//!
//! Learning algorithms live behind this trait. The hierarchy only needs to
//! hand an agent goals, ask it for actions, show it transitions and reset its
//! per-episode state.

use hac_types::{Action, Observation};

use crate::error::ComponentResult;

/// One interaction with the lower environment, as seen by the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub observation: Observation,
    pub action: Action,
    pub reward: f64,
    pub next_observation: Observation,
    pub done: bool,
    /// Goal the agent was pursuing, if the level above set one
    pub goal: Option<Vec<f32>>,
}

/// An agent that acts at one level of the hierarchy.
pub trait Agent {
    /// Agent name, `agent_{level}` once built by a graph manager.
    fn name(&self) -> &str;

    /// Chooses an action for the current observation.
    fn act(&mut self, observation: &Observation) -> ComponentResult<Action>;

    /// Records the outcome of the last action.
    fn observe(&mut self, transition: &Transition) -> ComponentResult<()> {
        let _ = transition;
        Ok(())
    }

    /// Sets (or clears) the goal handed down by the level above.
    fn set_goal(&mut self, goal: Option<Vec<f32>>) {
        let _ = goal;
    }

    /// Clears per-episode internal state.
    fn reset_internal_state(&mut self) {}

    /// Asked of the top-level agent before each new sub-goal. Returning true
    /// marks that sub-goal as a test for every level of the hierarchy.
    fn should_test_sub_goal(&mut self) -> bool {
        false
    }

    /// Tells the agent whether the current sub-goal is being tested. Agents
    /// typically stop exploring while it is set.
    fn set_sub_goal_testing(&mut self, testing: bool) {
        let _ = testing;
    }

    /// One-line description for construction logs.
    fn summary(&self) -> String {
        self.name().to_string()
    }
}
