//! Command-line driver: load a preset, build its graph, run it.

mod run;

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use hac::hac_types::{Preset, TaskParameters};
use hac::ComponentRegistry;

use crate::run::{RunOptions, ValidationOutcome};

/// Default preset path
const DEFAULT_PRESET_PATH: &str = "presets/chain_hac.toml";

#[derive(Parser, Debug)]
#[command(name = "hac")]
#[command(about = "Build and drive a hierarchical actor-critic graph from a preset")]
struct Args {
    /// Preset file describing the environment and the agent of every level
    #[arg(short, long, default_value = DEFAULT_PRESET_PATH)]
    preset: PathBuf,

    /// Seed for the environment and agents
    #[arg(short, long)]
    seed: Option<u64>,

    /// Environment steps to run, instead of the preset's schedule
    #[arg(long)]
    steps: Option<u64>,

    /// Directory the JSON run report is written to
    #[arg(long, default_value = "./experiments")]
    experiment_path: PathBuf,

    /// Print the constructed graph as part of the report
    #[arg(long)]
    dump_graph: bool,

    /// Check the preset's reward threshold after the run
    #[arg(long)]
    validate: bool,
}

impl Args {
    fn task_parameters(&self) -> TaskParameters {
        TaskParameters {
            experiment_path: self.experiment_path.clone(),
            seed: self.seed,
            ..TaskParameters::default()
        }
    }

    fn run_options(&self) -> RunOptions {
        RunOptions {
            steps: self.steps,
            task: self.task_parameters(),
            dump_graph: self.dump_graph,
            validate: self.validate,
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hac=info,hac_cli=info,warn"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install tracing subscriber: {e}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging();

    info!(preset = %args.preset.display(), seed = ?args.seed, "Loading preset");
    let preset = Preset::from_file(&args.preset)?;
    if args.validate && !preset.validation.test {
        warn!("preset does not enable validation, checking thresholds anyway");
    }

    let registry = ComponentRegistry::with_builtins();
    let report = run::run(preset, &registry, &args.run_options())?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    let path = run::write_report(&report, &args.experiment_path)?;
    info!(path = %path.display(), "Wrote run report");

    if let Some(ValidationOutcome::Failed { reason }) = &report.validation {
        return Err(format!("preset validation failed: {reason}").into());
    }
    Ok(())
}
