//! Built-in components.
//!
//! A deliberately small environment and agent so a hierarchy can be built and
//! driven without any external learning framework.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use hac_types::{
    Action, EnvironmentParameters, LevelParameters, Observation, Space, SpacesDefinition,
};

use crate::agent::{Agent, Transition};
use crate::environment::{EnvResponse, Environment};
use crate::error::ComponentResult;

/// Errors raised by the built-in components.
#[derive(Debug, Error, PartialEq)]
pub enum BuiltinError {
    #[error("chain length must be at least 2, got {0}")]
    ChainTooShort(u64),
    #[error("chain start {start} is outside a chain of length {length}")]
    StartOutOfRange { start: u64, length: u64 },
    #[error("slip probability must be in [0, 1], got {0}")]
    InvalidSlip(f64),
    #[error("chain accepts discrete actions 0 (left) and 1 (right), got {0:?}")]
    InvalidAction(Action),
}

/// A 1-D chain. The agent starts at `start` and must walk right to the last
/// cell. Every step costs -1 until the end is reached.
#[derive(Debug)]
pub struct ChainEnvironment {
    length: u64,
    start: u64,
    position: u64,
    /// Chance that a move goes the opposite way
    slip: f64,
    max_episode_steps: u64,
    episode_steps: u64,
    rng: SmallRng,
}

impl ChainEnvironment {
    /// Registry tag.
    pub const TAG: &'static str = "chain";

    /// Builds a chain from environment parameters.
    ///
    /// Settings: `length` (default 10), `start` (default 0), `slip` (default 0).
    pub fn from_parameters(params: &EnvironmentParameters) -> Result<Self, BuiltinError> {
        let length = params.settings.get_u64("length").unwrap_or(10);
        let start = params.settings.get_u64("start").unwrap_or(0);
        let slip = params.settings.get_f64("slip").unwrap_or(0.0);
        let mut chain = Self::new(length, start, params.max_episode_steps)?;
        if !(0.0..=1.0).contains(&slip) {
            return Err(BuiltinError::InvalidSlip(slip));
        }
        chain.slip = slip;
        chain.rng = match params.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Ok(chain)
    }

    /// Creates a deterministic chain.
    pub fn new(length: u64, start: u64, max_episode_steps: u64) -> Result<Self, BuiltinError> {
        if length < 2 {
            return Err(BuiltinError::ChainTooShort(length));
        }
        if start >= length {
            return Err(BuiltinError::StartOutOfRange { start, length });
        }
        Ok(Self {
            length,
            start,
            position: start,
            slip: 0.0,
            max_episode_steps,
            episode_steps: 0,
            rng: SmallRng::seed_from_u64(0),
        })
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    fn goal_cell(&self) -> u64 {
        self.length - 1
    }
}

impl Environment for ChainEnvironment {
    fn name(&self) -> &str {
        Self::TAG
    }

    fn observation_space(&self) -> Space {
        Space::Continuous { low: vec![0.0], high: vec![self.goal_cell() as f32] }
    }

    fn action_space(&self) -> Space {
        Space::Discrete { n: 2 }
    }

    fn reset(&mut self) -> ComponentResult<Observation> {
        self.position = self.start;
        self.episode_steps = 0;
        Ok(vec![self.position as f32])
    }

    fn step(&mut self, action: &Action) -> ComponentResult<EnvResponse> {
        let mut right = match action {
            Action::Discrete(0) => false,
            Action::Discrete(1) => true,
            other => return Err(BuiltinError::InvalidAction(other.clone()).into()),
        };
        if self.slip > 0.0 && self.rng.gen_bool(self.slip) {
            right = !right;
        }

        self.position = if right {
            (self.position + 1).min(self.goal_cell())
        } else {
            self.position.saturating_sub(1)
        };
        self.episode_steps += 1;

        let reached = self.position == self.goal_cell();
        Ok(EnvResponse {
            observation: vec![self.position as f32],
            reward: if reached { 0.0 } else { -1.0 },
            done: reached || self.episode_steps >= self.max_episode_steps,
        })
    }

    fn render(&self) -> Option<String> {
        let cells: String = (0..self.length)
            .map(|cell| match cell {
                c if c == self.position => 'A',
                c if c == self.goal_cell() => 'G',
                _ => '.',
            })
            .collect();
        Some(cells)
    }
}

/// Picks uniformly random actions. Never learns.
///
/// Keeps the current goal and a step count as internal state so that resets
/// are observable. Setting: `sub_goal_testing_rate` (default 0), the chance
/// that a new sub-goal is tested when this agent is at the top.
#[derive(Debug)]
pub struct RandomAgent {
    name: String,
    action_space: Space,
    goal: Option<Vec<f32>>,
    steps_since_reset: u64,
    transitions_seen: u64,
    sub_goal_testing_rate: f64,
    testing_sub_goal: bool,
    rng: SmallRng,
}

impl RandomAgent {
    /// Registry tag.
    pub const TAG: &'static str = "random";

    /// Creates a random agent for one level.
    ///
    /// Seeded from the task seed plus the level index when a seed is set.
    pub fn new(params: &LevelParameters, spaces: &SpacesDefinition) -> Self {
        let rng = match params.seed() {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self {
            name: params.name.clone(),
            action_space: spaces.action.clone(),
            goal: None,
            steps_since_reset: 0,
            transitions_seen: 0,
            sub_goal_testing_rate: params.settings.get_f64("sub_goal_testing_rate").unwrap_or(0.0),
            testing_sub_goal: false,
            rng,
        }
    }

    pub fn goal(&self) -> Option<&[f32]> {
        self.goal.as_deref()
    }

    pub fn steps_since_reset(&self) -> u64 {
        self.steps_since_reset
    }

    pub fn transitions_seen(&self) -> u64 {
        self.transitions_seen
    }

    pub fn is_testing_sub_goal(&self) -> bool {
        self.testing_sub_goal
    }
}

impl Agent for RandomAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn act(&mut self, _observation: &Observation) -> ComponentResult<Action> {
        self.steps_since_reset += 1;
        Ok(self.action_space.sample(&mut self.rng))
    }

    fn observe(&mut self, _transition: &Transition) -> ComponentResult<()> {
        self.transitions_seen += 1;
        Ok(())
    }

    fn set_goal(&mut self, goal: Option<Vec<f32>>) {
        self.goal = goal;
    }

    fn reset_internal_state(&mut self) {
        self.goal = None;
        self.steps_since_reset = 0;
    }

    fn should_test_sub_goal(&mut self) -> bool {
        if self.sub_goal_testing_rate.is_nan() || self.sub_goal_testing_rate <= 0.0 {
            return false;
        }
        self.rng.gen_bool(self.sub_goal_testing_rate.min(1.0))
    }

    fn set_sub_goal_testing(&mut self, testing: bool) {
        self.testing_sub_goal = testing;
    }

    fn summary(&self) -> String {
        format!("{} (random, action dimension {})", self.name, self.action_space.dimension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hac_types::{EnvironmentSteps, Settings};

    #[test]
    fn test_chain_validation() {
        assert_eq!(ChainEnvironment::new(1, 0, 10).err(), Some(BuiltinError::ChainTooShort(1)));
        assert_eq!(
            ChainEnvironment::new(4, 4, 10).err(),
            Some(BuiltinError::StartOutOfRange { start: 4, length: 4 })
        );

        let mut params = EnvironmentParameters::new("chain");
        params.settings = Settings::new().with("slip", 1.5);
        assert_eq!(
            ChainEnvironment::from_parameters(&params).err(),
            Some(BuiltinError::InvalidSlip(1.5))
        );
    }

    #[test]
    fn test_chain_walks_to_goal() {
        let mut chain = ChainEnvironment::new(3, 0, 100).unwrap();
        assert_eq!(chain.reset().unwrap(), vec![0.0]);

        let first = chain.step(&Action::Discrete(1)).unwrap();
        assert_eq!(first, EnvResponse::running(vec![1.0], -1.0));

        let second = chain.step(&Action::Discrete(1)).unwrap();
        assert_eq!(second.observation, vec![2.0]);
        assert_eq!(second.reward, 0.0);
        assert!(second.done);
    }

    #[test]
    fn test_chain_left_edge_and_time_limit() {
        let mut chain = ChainEnvironment::new(5, 0, 2).unwrap();
        chain.reset().unwrap();
        let response = chain.step(&Action::Discrete(0)).unwrap();
        assert_eq!(chain.position(), 0);
        assert!(!response.done);
        let response = chain.step(&Action::Discrete(0)).unwrap();
        assert!(response.done);
    }

    #[test]
    fn test_chain_rejects_bad_action() {
        let mut chain = ChainEnvironment::new(3, 0, 10).unwrap();
        chain.reset().unwrap();
        assert!(chain.step(&Action::Discrete(2)).is_err());
        assert!(chain.step(&Action::Continuous(vec![1.0])).is_err());
    }

    #[test]
    fn test_chain_render() {
        let mut chain = ChainEnvironment::new(4, 1, 10).unwrap();
        chain.reset().unwrap();
        assert_eq!(chain.render().as_deref(), Some(".A.G"));
    }

    #[test]
    fn test_full_slip_reverses_moves() {
        let mut params = EnvironmentParameters::new("chain");
        params.seed = Some(3);
        params.settings = Settings::new().with("length", 5).with("start", 2).with("slip", 1.0);
        let mut chain = ChainEnvironment::from_parameters(&params).unwrap();
        chain.reset().unwrap();
        chain.step(&Action::Discrete(1)).unwrap();
        assert_eq!(chain.position(), 1);
    }

    fn level(rate: Option<f64>) -> LevelParameters {
        let mut settings = Settings::new();
        if let Some(rate) = rate {
            settings = settings.with("sub_goal_testing_rate", rate);
        }
        LevelParameters {
            level: 0,
            name: "agent_0".to_string(),
            component: RandomAgent::TAG.to_string(),
            input_filter: Default::default(),
            output_filter: Default::default(),
            visualization: Default::default(),
            task: None,
            is_a_highest_level_agent: true,
            is_a_lowest_level_agent: false,
            steps_limit: EnvironmentSteps::ONE,
            reset_agent_state_after_time_limit: false,
            settings,
        }
    }

    fn spaces() -> SpacesDefinition {
        SpacesDefinition::for_environment(
            Space::Continuous { low: vec![0.0], high: vec![4.0] },
            Space::Discrete { n: 2 },
        )
    }

    #[test]
    fn test_random_agent_sub_goal_testing_rate() {
        let mut never = RandomAgent::new(&level(None), &spaces());
        assert!((0..50).all(|_| !never.should_test_sub_goal()));

        let mut always = RandomAgent::new(&level(Some(1.0)), &spaces());
        assert!((0..50).all(|_| always.should_test_sub_goal()));

        let mut clamped = RandomAgent::new(&level(Some(7.5)), &spaces());
        assert!(clamped.should_test_sub_goal());

        always.set_sub_goal_testing(true);
        assert!(always.is_testing_sub_goal());
    }

    #[test]
    fn test_random_agent_reset_clears_goal() {
        let mut agent = RandomAgent::new(&level(None), &spaces());
        agent.set_goal(Some(vec![3.0]));
        let action = agent.act(&vec![0.0]).unwrap();
        assert!(spaces().action.contains(&action));
        assert_eq!(agent.steps_since_reset(), 1);

        agent.reset_internal_state();
        assert!(agent.goal().is_none());
        assert_eq!(agent.steps_since_reset(), 0);
    }
}
