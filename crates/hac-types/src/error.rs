//! Configuration errors.

use thiserror::Error;

use crate::filter::FilterError;

/// Errors raised while loading or validating a hierarchy configuration.
///
/// All of these are fatal: the caller has to fix the configuration and build
/// the graph again from scratch.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading a preset file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing a TOML preset
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Error writing a preset back to TOML
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Per-level step list does not have one entry per level
    #[error(
        "consecutive_steps_to_run_non_top_levels has {actual} entries but the hierarchy has \
         {expected} levels; pass one value per level or a single value for all levels"
    )]
    StepsListLengthMismatch { expected: usize, actual: usize },

    /// Hierarchy is too shallow to be hierarchical
    #[error(
        "a HAC hierarchy needs agent parameters for at least two levels, got {levels}; \
         use the basic RL graph manager for a single agent"
    )]
    TooFewLevels { levels: usize },

    /// A non-top level would never get to act
    #[error("level {level} has a step budget of zero")]
    ZeroStepBudget { level: usize },

    /// A level's resolved filters would fail when applied
    #[error("level {level} has an invalid {which} filter: {source}")]
    InvalidFilter {
        level: usize,
        which: &'static str,
        #[source]
        source: FilterError,
    },

    /// A single-level graph manager was given the wrong number of agents
    #[error("the basic RL graph manager expects exactly one agent, got {agents}")]
    NotSingleAgent { agents: usize },
}
