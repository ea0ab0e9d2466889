//! Shared configuration and value types for hierarchical RL graphs.
//!
//! This crate contains pure data structures with no graph-building logic.
//! It is a dependency for all other crates in the workspace.

pub mod error;
pub mod filter;
pub mod params;
pub mod preset;
pub mod space;
pub mod steps;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

pub use error::ConfigError;

// Re-export step types
pub use steps::{EnvironmentSteps, ParseStepsError, StepsPerLevel};

// Re-export space types
pub use space::{Action, Observation, Space, SpaceError, SpacesDefinition};

// Re-export filter types
pub use filter::{
    ActionFilter, FilterError, InputFilter, ObservationFilter, OutputFilter, RewardFilter,
};

// Re-export parameter types
pub use params::{
    AgentParameters, EnvironmentParameters, LevelParameters, PresetValidationParameters,
    ScheduleParameters, Settings, TaskParameters, VisualizationParameters,
};

pub use preset::Preset;
