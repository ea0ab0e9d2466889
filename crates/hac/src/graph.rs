//! Constructed hierarchies.
//!
//! A [`Graph`] is what a graph manager returns: the level managers, top level
//! first, and the single real environment at the bottom.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use hac_types::{EnvironmentSteps, LevelParameters, Observation, Space, VisualizationParameters};

use crate::environment::{EnvHandle, Environment};
use crate::error::HacError;
use crate::level_manager::{LevelManager, SubGoalTesting};

/// Shared handle to a level manager.
pub type SharedLevelManager = Rc<RefCell<LevelManager>>;

/// Outcome of driving a graph for a number of environment steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActSummary {
    /// Steps taken in the real environment
    pub environment_steps: u64,
    /// Steps taken by the top level
    pub top_level_steps: u64,
    /// Total reward of each episode finished during the call
    pub episode_rewards: Vec<f64>,
}

impl ActSummary {
    pub fn episodes_completed(&self) -> usize {
        self.episode_rewards.len()
    }

    /// Mean reward over finished episodes, None if none finished.
    pub fn mean_episode_reward(&self) -> Option<f64> {
        if self.episode_rewards.is_empty() {
            return None;
        }
        Some(self.episode_rewards.iter().sum::<f64>() / self.episode_rewards.len() as f64)
    }
}

/// Diagnostic view of one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSummary {
    pub name: String,
    pub agent: String,
    pub steps_limit: EnvironmentSteps,
    pub reset_agent_state_after_time_limit: bool,
    pub observation_space: Space,
    pub action_space: Space,
    pub total_steps: u64,
}

/// Diagnostic view of a whole graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub id: Uuid,
    pub name: String,
    pub environment: String,
    /// Top level first
    pub levels: Vec<LevelSummary>,
}

/// A built hierarchy.
pub struct Graph {
    id: Uuid,
    name: String,
    level_managers: Vec<SharedLevelManager>,
    environments: Vec<EnvHandle>,
    levels: Vec<LevelParameters>,
    visualization: VisualizationParameters,
    sub_goal_testing: SubGoalTesting,
    episode_in_progress: bool,
    episode_reward: f64,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("level_managers", &self.level_managers)
            .field("episode_in_progress", &self.episode_in_progress)
            .finish()
    }
}

impl Graph {
    pub(crate) fn new(
        name: impl Into<String>,
        level_managers: Vec<SharedLevelManager>,
        environment: EnvHandle,
        levels: Vec<LevelParameters>,
        visualization: VisualizationParameters,
        sub_goal_testing: SubGoalTesting,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            level_managers,
            environments: vec![environment],
            levels,
            visualization,
            sub_goal_testing,
            episode_in_progress: false,
            episode_reward: 0.0,
        }
    }

    /// Unique id of this graph instance.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Name of the graph manager that built this graph.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Level managers, top level first.
    pub fn level_managers(&self) -> &[SharedLevelManager] {
        &self.level_managers
    }

    /// Environments of the graph. Always exactly one.
    pub fn environments(&self) -> &[EnvHandle] {
        &self.environments
    }

    /// Resolved parameters each level was built from, top level first.
    pub fn level_parameters(&self) -> &[LevelParameters] {
        &self.levels
    }

    /// True while the top level's current sub-goal is being tested.
    pub fn is_testing_sub_goal(&self) -> bool {
        self.sub_goal_testing.get()
    }

    /// The level nobody sets goals for.
    pub fn top_level(&self) -> Result<&SharedLevelManager, HacError> {
        self.level_managers.first().ok_or(HacError::EmptyGraph)
    }

    /// The real environment at the bottom of the hierarchy.
    pub fn root_environment(&self) -> Option<&EnvHandle> {
        self.environments.first()
    }

    /// Starts a new episode on every level.
    pub fn reset(&mut self) -> Result<Observation, HacError> {
        let observation = self.top_level()?.borrow_mut().reset()?;
        self.episode_in_progress = true;
        self.episode_reward = 0.0;
        Ok(observation)
    }

    /// Drives the top level until at least `steps` real environment steps
    /// have been taken, starting new episodes as old ones end.
    pub fn act(&mut self, steps: EnvironmentSteps) -> Result<ActSummary, HacError> {
        let mut summary = ActSummary::default();
        let start = self.environment_steps();

        while summary.environment_steps < steps.get() {
            if !self.episode_in_progress {
                self.reset()?;
            }

            let response = self.top_level()?.borrow_mut().step_with_goal(None)?;
            summary.top_level_steps += 1;
            self.episode_reward += response.reward;
            self.render_frame();

            let taken = self.environment_steps() - start;
            if taken == summary.environment_steps {
                debug!(graph = %self.name, "top-level step made no progress, stopping");
                break;
            }
            summary.environment_steps = taken;

            if response.done {
                debug!(graph = %self.name, reward = self.episode_reward, "episode finished");
                summary.episode_rewards.push(self.episode_reward);
                self.episode_in_progress = false;
            }
        }

        info!(
            graph = %self.name,
            environment_steps = summary.environment_steps,
            episodes = summary.episodes_completed(),
            "act finished"
        );
        Ok(summary)
    }

    /// Real environment steps taken since construction.
    pub fn environment_steps(&self) -> u64 {
        self.level_managers
            .last()
            .map(|bottom| bottom.borrow().total_steps())
            .unwrap_or(0)
    }

    /// Builds a diagnostic summary.
    pub fn summary(&self) -> GraphSummary {
        let environment = self
            .root_environment()
            .map(|env| env.borrow().name().to_string())
            .unwrap_or_default();
        let levels = self
            .level_managers
            .iter()
            .map(|level| {
                let level = level.borrow();
                LevelSummary {
                    name: level.name().to_string(),
                    agent: level.agent().name().to_string(),
                    steps_limit: level.steps_limit(),
                    reset_agent_state_after_time_limit: level.resets_agent_state_after_time_limit(),
                    observation_space: level.observation_space(),
                    action_space: level.action_space(),
                    total_steps: level.total_steps(),
                }
            })
            .collect();
        GraphSummary { id: self.id, name: self.name.clone(), environment, levels }
    }

    fn render_frame(&self) {
        if !self.visualization.render {
            return;
        }
        if let Some(frame) = self.root_environment().and_then(|env| env.borrow().render()) {
            info!(graph = %self.name, "{}", frame);
        }
    }
}
