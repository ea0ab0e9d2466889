//! Preset loading.
//!
//! A preset bundles everything needed to build a hierarchy into one TOML file.
//!
//! ```toml
//! consecutive_steps_to_run_non_top_levels = 5
//!
//! [environment]
//! component = "chain"
//!
//! [[agents]]
//! component = "random"
//!
//! [[agents]]
//! component = "random"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::params::{
    AgentParameters, EnvironmentParameters, PresetValidationParameters, ScheduleParameters,
    VisualizationParameters,
};
use crate::steps::StepsPerLevel;

/// Complete description of a hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    /// Steps each non-top level runs before yielding upward
    #[serde(default)]
    pub consecutive_steps_to_run_non_top_levels: StepsPerLevel,
    /// Environment at the bottom of the hierarchy
    pub environment: EnvironmentParameters,
    /// Training schedule
    #[serde(default)]
    pub schedule: ScheduleParameters,
    /// Visualization settings shared by every level
    #[serde(default)]
    pub visualization: VisualizationParameters,
    /// Validation thresholds
    #[serde(default)]
    pub validation: PresetValidationParameters,
    /// One entry per level, top level first
    pub agents: Vec<AgentParameters>,
}

impl Preset {
    /// Loads a preset from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_str(&content)
    }

    /// Parses a preset from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Writes the preset back out as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Number of configured levels.
    pub fn levels(&self) -> usize {
        self.agents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::EnvironmentSteps;
    use std::io::Write;

    const TWO_LEVELS: &str = r#"
        consecutive_steps_to_run_non_top_levels = 5

        [environment]
        component = "chain"
        max_episode_steps = 50

        [[agents]]
        component = "random"

        [[agents]]
        component = "random"
        input_filter = { observation = [{ type = "scale", factor = 0.1 }] }
    "#;

    #[test]
    fn test_parse_two_levels() {
        let preset = Preset::from_str(TWO_LEVELS).unwrap();
        assert_eq!(preset.levels(), 2);
        assert_eq!(
            preset.consecutive_steps_to_run_non_top_levels,
            StepsPerLevel::Shared(EnvironmentSteps(5))
        );
        assert_eq!(preset.environment.max_episode_steps, 50);
        assert!(preset.agents[0].input_filter.is_none());
        assert!(preset.agents[1].input_filter.is_some());
        assert_eq!(preset.schedule, ScheduleParameters::default());
    }

    #[test]
    fn test_parse_per_level_steps() {
        let preset = Preset::from_str(
            r#"
            consecutive_steps_to_run_non_top_levels = [1, 10, 4]
            [environment]
            component = "chain"
            [[agents]]
            component = "random"
            "#,
        )
        .unwrap();
        assert_eq!(preset.consecutive_steps_to_run_non_top_levels.per_level_len(), Some(3));
    }

    #[test]
    fn test_invalid_steps_shape_is_parse_error() {
        let result = Preset::from_str(
            r#"
            consecutive_steps_to_run_non_top_levels = "lots"
            [environment]
            component = "chain"
            [[agents]]
            component = "random"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_toml_roundtrip_keeps_levels() {
        let preset = Preset::from_str(TWO_LEVELS).unwrap();
        let written = preset.to_toml().unwrap();
        let reparsed = Preset::from_str(&written).unwrap();
        assert_eq!(preset, reparsed);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TWO_LEVELS.as_bytes()).unwrap();
        let preset = Preset::from_file(file.path()).unwrap();
        assert_eq!(preset.environment.component, "chain");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = Preset::from_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
