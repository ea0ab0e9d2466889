//! Parameter structures for agents, environments and the surrounding graph.
//!
//! These are plain data. `AgentParameters` is what a preset author writes;
//! `LevelParameters` is the resolved, per-level view the graph manager hands
//! to agent constructors once defaults are filled in.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::filter::{InputFilter, OutputFilter};
use crate::steps::EnvironmentSteps;

/// Free-form settings forwarded to a component constructor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(pub BTreeMap<String, Value>);

impl Settings {
    /// Creates an empty settings map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value, returning self for chaining.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Gets a raw value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Gets a non-negative integer setting.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    /// Gets a numeric setting.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    /// Gets a string setting.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Returns true if no settings are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Agent configuration for one level of the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentParameters {
    /// Registry tag of the agent constructor
    pub component: String,
    /// Falls back to the environment's default input filter when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_filter: Option<InputFilter>,
    /// Falls back to the environment's default output filter when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_filter: Option<OutputFilter>,
    /// Constructor-specific settings
    #[serde(default, skip_serializing_if = "Settings::is_empty")]
    pub settings: Settings,
}

impl AgentParameters {
    /// Creates parameters for the given registry tag with nothing else set.
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            input_filter: None,
            output_filter: None,
            settings: Settings::new(),
        }
    }

    /// Sets an explicit input filter.
    pub fn with_input_filter(mut self, filter: InputFilter) -> Self {
        self.input_filter = Some(filter);
        self
    }

    /// Sets an explicit output filter.
    pub fn with_output_filter(mut self, filter: OutputFilter) -> Self {
        self.output_filter = Some(filter);
        self
    }

    /// Sets constructor settings.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }
}

/// Environment configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentParameters {
    /// Registry tag of the environment constructor
    pub component: String,
    /// Seed for the environment's own randomness
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Episode is cut off after this many steps
    #[serde(default = "default_max_episode_steps")]
    pub max_episode_steps: u64,
    /// Input filter for agents that do not set their own
    #[serde(default)]
    pub default_input_filter: InputFilter,
    /// Output filter for agents that do not set their own
    #[serde(default)]
    pub default_output_filter: OutputFilter,
    /// Constructor-specific settings
    #[serde(default, skip_serializing_if = "Settings::is_empty")]
    pub settings: Settings,
}

fn default_max_episode_steps() -> u64 {
    1000
}

impl EnvironmentParameters {
    /// Creates parameters for the given registry tag with identity default filters.
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            seed: None,
            max_episode_steps: default_max_episode_steps(),
            default_input_filter: InputFilter::default(),
            default_output_filter: OutputFilter::default(),
            settings: Settings::new(),
        }
    }

    /// Returns the input filter agents inherit when they set none.
    pub fn default_input_filter(&self) -> InputFilter {
        self.default_input_filter.clone()
    }

    /// Returns the output filter agents inherit when they set none.
    pub fn default_output_filter(&self) -> OutputFilter {
        self.default_output_filter.clone()
    }
}

/// Visualization settings shared by every level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationParameters {
    /// Render the root environment after every top-level step
    pub render: bool,
    /// Log a summary of each agent at construction
    pub print_networks_summary: bool,
}

impl Default for VisualizationParameters {
    fn default() -> Self {
        Self { render: false, print_networks_summary: false }
    }
}

/// Per-run task settings propagated to every agent at graph construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskParameters {
    /// Directory run outputs are written to; agents may store their own files here
    pub experiment_path: PathBuf,
    /// Global seed, agents offset it by their level index
    pub seed: Option<u64>,
}

impl Default for TaskParameters {
    fn default() -> Self {
        Self { experiment_path: PathBuf::from("./experiments"), seed: None }
    }
}

/// How many environment steps a run takes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleParameters {
    pub heatup_steps: EnvironmentSteps,
    pub improve_steps: EnvironmentSteps,
}

impl ScheduleParameters {
    /// Heatup plus improve steps, saturating at `u64::MAX`.
    pub fn total_steps(&self) -> EnvironmentSteps {
        EnvironmentSteps(self.heatup_steps.get().saturating_add(self.improve_steps.get()))
    }
}

impl Default for ScheduleParameters {
    fn default() -> Self {
        Self { heatup_steps: EnvironmentSteps(0), improve_steps: EnvironmentSteps(100) }
    }
}

/// Thresholds a preset is expected to reach in automated validation runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetValidationParameters {
    /// Whether this preset takes part in validation runs
    pub test: bool,
    /// Mean episode reward that counts as solved
    pub min_reward_threshold: f64,
    /// Episodes allowed before the threshold must be reached
    pub max_episodes_to_achieve_reward: u64,
}

impl Default for PresetValidationParameters {
    fn default() -> Self {
        Self {
            test: false,
            min_reward_threshold: 0.0,
            max_episodes_to_achieve_reward: 1,
        }
    }
}

/// Fully resolved parameters for one level, as handed to an agent constructor.
///
/// Unlike `AgentParameters`, nothing here is optional: filters have been
/// filled from environment defaults and position flags are set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelParameters {
    /// Index in the hierarchy, 0 is the top
    pub level: usize,
    /// Agent name, `agent_{level}`
    pub name: String,
    /// Registry tag of the agent constructor
    pub component: String,
    pub input_filter: InputFilter,
    pub output_filter: OutputFilter,
    pub visualization: VisualizationParameters,
    /// Set when the graph is created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskParameters>,
    pub is_a_highest_level_agent: bool,
    pub is_a_lowest_level_agent: bool,
    /// Steps this level runs per step of the level above
    pub steps_limit: EnvironmentSteps,
    /// Whether the agent's internal state resets when its time limit passes
    pub reset_agent_state_after_time_limit: bool,
    #[serde(default, skip_serializing_if = "Settings::is_empty")]
    pub settings: Settings,
}

impl LevelParameters {
    /// Seed for this level: the task seed offset by the level index.
    pub fn seed(&self) -> Option<u64> {
        self.task
            .as_ref()
            .and_then(|task| task.seed)
            .map(|seed| seed.wrapping_add(self.level as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ObservationFilter;

    #[test]
    fn test_agent_parameters_minimal_toml() {
        let params: AgentParameters = toml::from_str(r#"component = "random""#).unwrap();
        assert_eq!(params.component, "random");
        assert!(params.input_filter.is_none());
        assert!(params.output_filter.is_none());
        assert!(params.settings.is_empty());
    }

    #[test]
    fn test_agent_parameters_builders() {
        let filter = InputFilter {
            observation: vec![ObservationFilter::Scale { factor: 0.5 }],
            reward: vec![],
        };
        let params = AgentParameters::new("random")
            .with_input_filter(filter.clone())
            .with_settings(Settings::new().with("epsilon", 0.1));
        assert_eq!(params.input_filter, Some(filter));
        assert_eq!(params.settings.get_f64("epsilon"), Some(0.1));
    }

    #[test]
    fn test_environment_defaults() {
        let env: EnvironmentParameters = toml::from_str(r#"component = "chain""#).unwrap();
        assert_eq!(env.max_episode_steps, 1000);
        assert!(env.default_input_filter().is_identity());
        assert!(env.default_output_filter().is_identity());
    }

    #[test]
    fn test_settings_accessors() {
        let settings = Settings::new().with("length", 12).with("mode", "dense");
        assert_eq!(settings.get_u64("length"), Some(12));
        assert_eq!(settings.get_str("mode"), Some("dense"));
        assert_eq!(settings.get_u64("mode"), None);
        assert!(settings.get("missing").is_none());
    }

    #[test]
    fn test_schedule_default() {
        let schedule = ScheduleParameters::default();
        assert_eq!(schedule.improve_steps, EnvironmentSteps(100));
        assert_eq!(schedule.heatup_steps, EnvironmentSteps(0));
        assert_eq!(schedule.total_steps(), EnvironmentSteps(100));
    }

    #[test]
    fn test_schedule_total_saturates() {
        let schedule = ScheduleParameters {
            heatup_steps: EnvironmentSteps(u64::MAX - 1),
            improve_steps: EnvironmentSteps(10),
        };
        assert_eq!(schedule.total_steps(), EnvironmentSteps(u64::MAX));
    }

    #[test]
    fn test_level_seed_offsets_by_level() {
        let level = LevelParameters {
            level: 2,
            name: "agent_2".to_string(),
            component: "random".to_string(),
            input_filter: InputFilter::default(),
            output_filter: OutputFilter::default(),
            visualization: VisualizationParameters::default(),
            task: Some(TaskParameters { seed: Some(40), ..TaskParameters::default() }),
            is_a_highest_level_agent: false,
            is_a_lowest_level_agent: true,
            steps_limit: EnvironmentSteps(5),
            reset_agent_state_after_time_limit: true,
            settings: Settings::new(),
        };
        assert_eq!(level.seed(), Some(42));
    }
}
