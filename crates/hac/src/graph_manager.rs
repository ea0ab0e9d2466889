//! Graph managers.
//!
//! A graph manager validates a hierarchy configuration up front and can then
//! build any number of independent graphs from it.
//!
//! Levels are built bottom-up: an agent needs the spaces of whatever it
//! controls, and those are only known once the level below exists.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, info, info_span};

use hac_types::{
    AgentParameters, ConfigError, EnvironmentParameters, EnvironmentSteps, LevelParameters,
    Preset, PresetValidationParameters, ScheduleParameters, StepsPerLevel, TaskParameters,
    VisualizationParameters,
};

use crate::environment::{share, EnvHandle};
use crate::error::HacError;
use crate::graph::{Graph, SharedLevelManager};
use crate::level_manager::{LevelManager, SubGoalTesting};
use crate::registry::ComponentRegistry;

/// Something that turns configuration into a runnable graph.
pub trait GraphManager {
    fn name(&self) -> &str;

    /// Instantiates the environment and every level.
    fn create_graph(
        &self,
        registry: &ComponentRegistry,
        task_parameters: &TaskParameters,
    ) -> Result<Graph, HacError>;
}

/// Builds a deep hierarchy with one agent per level and a single environment
/// at the bottom.
#[derive(Debug, Clone)]
pub struct HacGraphManager {
    agents_params: Vec<AgentParameters>,
    env_params: EnvironmentParameters,
    schedule_params: ScheduleParameters,
    visualization_params: VisualizationParameters,
    consecutive_steps_to_run_non_top_levels: StepsPerLevel,
    preset_validation_params: PresetValidationParameters,
    /// Resolved per-level parameters, top level first
    levels: Vec<LevelParameters>,
}

impl HacGraphManager {
    /// Name given to every graph this manager builds.
    pub const NAME: &'static str = "hac_graph";

    /// Validates the configuration and resolves per-level parameters.
    ///
    /// `agents_params` lists the levels top first. The step budget for every
    /// non-top level comes from `consecutive_steps_to_run_non_top_levels`;
    /// the top level always runs exactly one step per call.
    pub fn new(
        agents_params: Vec<AgentParameters>,
        env_params: EnvironmentParameters,
        schedule_params: ScheduleParameters,
        visualization_params: VisualizationParameters,
        consecutive_steps_to_run_non_top_levels: impl Into<StepsPerLevel>,
    ) -> Result<Self, ConfigError> {
        let steps = consecutive_steps_to_run_non_top_levels.into();

        if let Some(actual) = steps.per_level_len() {
            if actual != agents_params.len() {
                return Err(ConfigError::StepsListLengthMismatch {
                    expected: agents_params.len(),
                    actual,
                });
            }
        }

        if agents_params.len() < 2 {
            return Err(ConfigError::TooFewLevels { levels: agents_params.len() });
        }

        let levels = resolve_levels(&agents_params, &env_params, &visualization_params, &steps)?;

        Ok(Self {
            agents_params,
            env_params,
            schedule_params,
            visualization_params,
            consecutive_steps_to_run_non_top_levels: steps,
            preset_validation_params: PresetValidationParameters::default(),
            levels,
        })
    }

    /// Builds a manager from a loaded preset.
    pub fn from_preset(preset: Preset) -> Result<Self, ConfigError> {
        Ok(Self::new(
            preset.agents,
            preset.environment,
            preset.schedule,
            preset.visualization,
            preset.consecutive_steps_to_run_non_top_levels,
        )?
        .with_preset_validation(preset.validation))
    }

    /// Attaches preset validation thresholds.
    pub fn with_preset_validation(mut self, params: PresetValidationParameters) -> Self {
        self.preset_validation_params = params;
        self
    }

    /// Agent parameters exactly as supplied.
    pub fn agents_params(&self) -> &[AgentParameters] {
        &self.agents_params
    }

    pub fn env_params(&self) -> &EnvironmentParameters {
        &self.env_params
    }

    pub fn schedule_params(&self) -> &ScheduleParameters {
        &self.schedule_params
    }

    pub fn visualization_params(&self) -> &VisualizationParameters {
        &self.visualization_params
    }

    pub fn consecutive_steps_to_run_non_top_levels(&self) -> &StepsPerLevel {
        &self.consecutive_steps_to_run_non_top_levels
    }

    pub fn preset_validation_params(&self) -> &PresetValidationParameters {
        &self.preset_validation_params
    }

    /// Resolved per-level parameters, top level first.
    pub fn level_parameters(&self) -> &[LevelParameters] {
        &self.levels
    }
}

impl GraphManager for HacGraphManager {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn create_graph(
        &self,
        registry: &ComponentRegistry,
        task_parameters: &TaskParameters,
    ) -> Result<Graph, HacError> {
        build_graph(
            Self::NAME,
            registry,
            &self.env_params,
            &self.visualization_params,
            &self.levels,
            task_parameters,
        )
    }
}

/// The non-hierarchical alternative: one agent acting directly on the
/// environment, one step per call.
#[derive(Debug, Clone)]
pub struct BasicRlGraphManager {
    agent_params: AgentParameters,
    env_params: EnvironmentParameters,
    schedule_params: ScheduleParameters,
    visualization_params: VisualizationParameters,
    preset_validation_params: PresetValidationParameters,
    level: LevelParameters,
}

impl BasicRlGraphManager {
    pub const NAME: &'static str = "basic_rl_graph";

    pub fn new(
        agent_params: AgentParameters,
        env_params: EnvironmentParameters,
        schedule_params: ScheduleParameters,
        visualization_params: VisualizationParameters,
    ) -> Result<Self, ConfigError> {
        let level = resolve_level(
            0,
            1,
            &agent_params,
            &env_params,
            &visualization_params,
            EnvironmentSteps::ONE,
        )?;
        Ok(Self {
            agent_params,
            env_params,
            schedule_params,
            visualization_params,
            preset_validation_params: PresetValidationParameters::default(),
            level,
        })
    }

    /// Builds a manager from a preset with exactly one agent.
    pub fn from_preset(preset: Preset) -> Result<Self, ConfigError> {
        let agents = preset.agents.len();
        let agent_params = match <[AgentParameters; 1]>::try_from(preset.agents) {
            Ok([agent]) => agent,
            Err(_) => return Err(ConfigError::NotSingleAgent { agents }),
        };
        let mut manager =
            Self::new(agent_params, preset.environment, preset.schedule, preset.visualization)?;
        manager.preset_validation_params = preset.validation;
        Ok(manager)
    }

    pub fn agent_params(&self) -> &AgentParameters {
        &self.agent_params
    }

    pub fn schedule_params(&self) -> &ScheduleParameters {
        &self.schedule_params
    }

    pub fn preset_validation_params(&self) -> &PresetValidationParameters {
        &self.preset_validation_params
    }

    pub fn level_parameters(&self) -> &LevelParameters {
        &self.level
    }
}

impl GraphManager for BasicRlGraphManager {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn create_graph(
        &self,
        registry: &ComponentRegistry,
        task_parameters: &TaskParameters,
    ) -> Result<Graph, HacError> {
        build_graph(
            Self::NAME,
            registry,
            &self.env_params,
            &self.visualization_params,
            std::slice::from_ref(&self.level),
            task_parameters,
        )
    }
}

/// Fills defaults for every level without touching the supplied parameters.
fn resolve_levels(
    agents_params: &[AgentParameters],
    env_params: &EnvironmentParameters,
    visualization: &VisualizationParameters,
    steps: &StepsPerLevel,
) -> Result<Vec<LevelParameters>, ConfigError> {
    let count = agents_params.len();
    agents_params
        .iter()
        .enumerate()
        .map(|(level, params)| {
            let steps_limit = if level == 0 {
                EnvironmentSteps::ONE
            } else {
                let budget = steps.for_level(level).ok_or(ConfigError::StepsListLengthMismatch {
                    expected: count,
                    actual: steps.per_level_len().unwrap_or(0),
                })?;
                if budget.is_zero() {
                    return Err(ConfigError::ZeroStepBudget { level });
                }
                budget
            };
            resolve_level(level, count, params, env_params, visualization, steps_limit)
        })
        .collect()
}

fn resolve_level(
    level: usize,
    count: usize,
    params: &AgentParameters,
    env_params: &EnvironmentParameters,
    visualization: &VisualizationParameters,
    steps_limit: EnvironmentSteps,
) -> Result<LevelParameters, ConfigError> {
    let input_filter = params
        .input_filter
        .clone()
        .unwrap_or_else(|| env_params.default_input_filter());
    input_filter
        .validate()
        .map_err(|source| ConfigError::InvalidFilter { level, which: "input", source })?;

    let output_filter = params
        .output_filter
        .clone()
        .unwrap_or_else(|| env_params.default_output_filter());
    output_filter
        .validate()
        .map_err(|source| ConfigError::InvalidFilter { level, which: "output", source })?;

    Ok(LevelParameters {
        level,
        name: format!("agent_{}", level),
        component: params.component.clone(),
        input_filter,
        output_filter,
        visualization: visualization.clone(),
        task: None,
        is_a_highest_level_agent: level == 0,
        is_a_lowest_level_agent: level + 1 == count,
        steps_limit,
        reset_agent_state_after_time_limit: level > 0,
        settings: params.settings.clone(),
    })
}

fn build_graph(
    name: &str,
    registry: &ComponentRegistry,
    env_params: &EnvironmentParameters,
    visualization: &VisualizationParameters,
    levels: &[LevelParameters],
    task_parameters: &TaskParameters,
) -> Result<Graph, HacError> {
    let span = info_span!("create_graph", graph = name, levels = levels.len());
    let _enter = span.enter();

    let environment = share(registry.create_environment(env_params, visualization)?);
    info!("Created environment '{}'", environment.borrow().name());

    let levels: Vec<LevelParameters> = levels
        .iter()
        .cloned()
        .map(|mut level| {
            level.task = Some(task_parameters.clone());
            level
        })
        .collect();

    let sub_goal_testing = SubGoalTesting::default();
    let level_managers = build_levels(registry, &environment, &levels, &sub_goal_testing)?;
    let graph = Graph::new(
        name,
        level_managers,
        environment,
        levels,
        visualization.clone(),
        sub_goal_testing,
    );
    info!(id = %graph.id(), "Built {} levels", graph.level_managers().len());
    Ok(graph)
}

/// Builds level managers from the bottom level up and returns them top first.
fn build_levels(
    registry: &ComponentRegistry,
    environment: &EnvHandle,
    levels: &[LevelParameters],
    sub_goal_testing: &SubGoalTesting,
) -> Result<Vec<SharedLevelManager>, HacError> {
    let mut level_managers = VecDeque::with_capacity(levels.len());
    let mut current_env: EnvHandle = environment.clone();

    for level in levels.iter().rev() {
        let spaces = current_env.borrow().spaces();
        let agent = registry.create_agent(level, &spaces)?;
        if level.visualization.print_networks_summary {
            info!("{}", agent.summary());
        }

        let level_manager = LevelManager::new(
            format!("level_{}", level.level),
            agent,
            current_env.clone(),
            environment.clone(),
            level.steps_limit,
            level.reset_agent_state_after_time_limit,
        )
        .with_filters(level.input_filter.clone(), level.output_filter.clone())
        .with_sub_goal_testing(sub_goal_testing.clone(), level.is_a_highest_level_agent);
        debug!(
            level = level.level,
            agent = %level.name,
            steps_limit = level.steps_limit.get(),
            "Built level manager"
        );

        let level_manager = Rc::new(RefCell::new(level_manager));
        let lower: EnvHandle = level_manager.clone();
        current_env = lower;
        level_managers.push_front(level_manager);
    }

    Ok(level_managers.into())
}
