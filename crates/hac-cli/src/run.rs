//! Preset runs: build a graph from a preset, drive it, report.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use hac::hac_types::{
    ConfigError, EnvironmentSteps, Preset, PresetValidationParameters, TaskParameters,
};
use hac::{
    ActSummary, BasicRlGraphManager, ComponentRegistry, GraphManager, GraphSummary, HacError,
    HacGraphManager,
};

/// Knobs for a single run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Overrides the preset's heatup + improve steps
    pub steps: Option<u64>,
    pub task: TaskParameters,
    /// Include the graph summary in the report
    pub dump_graph: bool,
    /// Check the preset's validation thresholds
    pub validate: bool,
}

/// Result of checking preset validation thresholds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Passed { mean_reward: f64, episodes: usize },
    Failed { reason: String },
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub graph_manager: String,
    pub act: ActSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<GraphSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationOutcome>,
}

/// Picks the graph manager for a preset: single-agent presets get the basic
/// RL manager, deeper ones the HAC manager.
pub fn graph_manager_for(preset: Preset) -> Result<Box<dyn GraphManager>, ConfigError> {
    if preset.levels() == 1 {
        Ok(Box::new(BasicRlGraphManager::from_preset(preset)?))
    } else {
        Ok(Box::new(HacGraphManager::from_preset(preset)?))
    }
}

/// Builds and drives the graph described by `preset`.
pub fn run(
    preset: Preset,
    registry: &ComponentRegistry,
    options: &RunOptions,
) -> Result<RunReport, HacError> {
    let steps = options.steps.unwrap_or(preset.schedule.total_steps().get());
    let validation_params = preset.validation.clone();

    let manager = graph_manager_for(preset)?;
    let mut graph = manager.create_graph(registry, &options.task)?;
    info!(
        graph = manager.name(),
        levels = graph.level_managers().len(),
        steps,
        "Driving graph"
    );

    let act = graph.act(EnvironmentSteps(steps))?;
    let validation = options.validate.then(|| evaluate(&validation_params, &act));

    Ok(RunReport {
        graph_manager: manager.name().to_string(),
        act,
        graph: options.dump_graph.then(|| graph.summary()),
        validation,
    })
}

/// File name of the report inside the experiment directory.
pub const REPORT_FILE: &str = "run_report.json";

/// Writes the report as pretty JSON into `experiment_path`, creating the
/// directory if needed, and returns the file written.
pub fn write_report(report: &RunReport, experiment_path: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(experiment_path)?;
    let path = experiment_path.join(REPORT_FILE);
    fs::write(&path, serde_json::to_string_pretty(report)?)?;
    Ok(path)
}

/// Checks the mean reward of the first `max_episodes_to_achieve_reward`
/// finished episodes against the preset's threshold.
pub fn evaluate(params: &PresetValidationParameters, act: &ActSummary) -> ValidationOutcome {
    let window = (params.max_episodes_to_achieve_reward as usize).max(1);
    let rewards: Vec<f64> = act.episode_rewards.iter().take(window).copied().collect();
    if rewards.is_empty() {
        return ValidationOutcome::Failed { reason: "no episode finished".to_string() };
    }

    let mean_reward = rewards.iter().sum::<f64>() / rewards.len() as f64;
    if mean_reward >= params.min_reward_threshold {
        ValidationOutcome::Passed { mean_reward, episodes: rewards.len() }
    } else {
        ValidationOutcome::Failed {
            reason: format!(
                "mean reward {:.2} over {} episodes is below {:.2}",
                mean_reward,
                rewards.len(),
                params.min_reward_threshold
            ),
        }
    }
}
