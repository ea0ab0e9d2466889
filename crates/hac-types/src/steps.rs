//! Step Count Types
//!
//! Durations are counted in environment steps. A hierarchy can give every
//! non-top level the same budget, or one budget per level.
//!
//! # Example
//!
//! ```
//! use hac_types::{EnvironmentSteps, StepsPerLevel};
//!
//! let steps = StepsPerLevel::PerLevel(vec![EnvironmentSteps(1), EnvironmentSteps(10)]);
//! assert_eq!(steps.for_level(1), Some(EnvironmentSteps(10)));
//! assert_eq!(EnvironmentSteps(10).to_string(), "EnvironmentSteps(10)");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A number of environment steps.
///
/// Serializes as a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentSteps(pub u64);

impl EnvironmentSteps {
    /// A single step.
    pub const ONE: EnvironmentSteps = EnvironmentSteps(1);

    /// Returns the raw step count.
    pub fn get(self) -> u64 {
        self.0
    }

    /// Returns true if this budget allows no steps at all.
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for EnvironmentSteps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnvironmentSteps({})", self.0)
    }
}

impl From<u64> for EnvironmentSteps {
    fn from(steps: u64) -> Self {
        EnvironmentSteps(steps)
    }
}

/// Error type for parsing EnvironmentSteps from strings.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid step count: '{0}', expected 'N' or 'EnvironmentSteps(N)'")]
pub struct ParseStepsError(pub String);

impl FromStr for EnvironmentSteps {
    type Err = ParseStepsError;

    /// Parses either a bare integer or the display form `EnvironmentSteps(N)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("EnvironmentSteps(")
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or(trimmed);
        digits
            .trim()
            .parse::<u64>()
            .map(EnvironmentSteps)
            .map_err(|_| ParseStepsError(s.to_string()))
    }
}

/// How many consecutive steps each non-top level runs before yielding control
/// back to the level above it.
///
/// Written in a preset either as a single integer or as a list with one entry
/// per level (top level first). Any other shape fails to deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepsPerLevel {
    /// One budget applied to every non-top level
    Shared(EnvironmentSteps),
    /// One budget per level, top level first
    PerLevel(Vec<EnvironmentSteps>),
}

impl Default for StepsPerLevel {
    fn default() -> Self {
        StepsPerLevel::Shared(EnvironmentSteps(10))
    }
}

impl StepsPerLevel {
    /// Returns the configured budget for the level at `level_idx`.
    ///
    /// Returns None only for an out-of-range index into a per-level list.
    pub fn for_level(&self, level_idx: usize) -> Option<EnvironmentSteps> {
        match self {
            StepsPerLevel::Shared(steps) => Some(*steps),
            StepsPerLevel::PerLevel(steps) => steps.get(level_idx).copied(),
        }
    }

    /// Returns the list length for the per-level form.
    pub fn per_level_len(&self) -> Option<usize> {
        match self {
            StepsPerLevel::Shared(_) => None,
            StepsPerLevel::PerLevel(steps) => Some(steps.len()),
        }
    }
}

impl From<EnvironmentSteps> for StepsPerLevel {
    fn from(steps: EnvironmentSteps) -> Self {
        StepsPerLevel::Shared(steps)
    }
}

impl From<Vec<EnvironmentSteps>> for StepsPerLevel {
    fn from(steps: Vec<EnvironmentSteps>) -> Self {
        StepsPerLevel::PerLevel(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_display() {
        assert_eq!(EnvironmentSteps(1).to_string(), "EnvironmentSteps(1)");
        assert_eq!(EnvironmentSteps(250).to_string(), "EnvironmentSteps(250)");
    }

    #[test]
    fn test_steps_parse() {
        assert_eq!("5".parse::<EnvironmentSteps>().unwrap(), EnvironmentSteps(5));
        assert_eq!(
            "EnvironmentSteps(40)".parse::<EnvironmentSteps>().unwrap(),
            EnvironmentSteps(40)
        );
        assert_eq!(" 7 ".parse::<EnvironmentSteps>().unwrap(), EnvironmentSteps(7));
    }

    #[test]
    fn test_steps_parse_error() {
        assert!("five".parse::<EnvironmentSteps>().is_err());
        assert!("EnvironmentSteps(".parse::<EnvironmentSteps>().is_err());
        assert!("-3".parse::<EnvironmentSteps>().is_err());

        let err = "five".parse::<EnvironmentSteps>().unwrap_err();
        assert_eq!(err.to_string(), "invalid step count: 'five', expected 'N' or 'EnvironmentSteps(N)'");
    }

    #[test]
    fn test_steps_serialize_as_integer() {
        let json = serde_json::to_string(&EnvironmentSteps(12)).unwrap();
        assert_eq!(json, "12");
    }

    #[test]
    fn test_shared_for_every_level() {
        let steps = StepsPerLevel::Shared(EnvironmentSteps(8));
        assert_eq!(steps.for_level(0), Some(EnvironmentSteps(8)));
        assert_eq!(steps.for_level(17), Some(EnvironmentSteps(8)));
        assert_eq!(steps.per_level_len(), None);
    }

    #[test]
    fn test_per_level_lookup() {
        let steps = StepsPerLevel::from(vec![EnvironmentSteps(1), EnvironmentSteps(20)]);
        assert_eq!(steps.for_level(1), Some(EnvironmentSteps(20)));
        assert_eq!(steps.for_level(2), None);
        assert_eq!(steps.per_level_len(), Some(2));
    }

    #[test]
    fn test_untagged_deserialization() {
        let shared: StepsPerLevel = serde_json::from_str("5").unwrap();
        assert_eq!(shared, StepsPerLevel::Shared(EnvironmentSteps(5)));

        let list: StepsPerLevel = serde_json::from_str("[1, 10, 5]").unwrap();
        assert_eq!(list.per_level_len(), Some(3));
    }

    #[test]
    fn test_other_shapes_rejected() {
        assert!(serde_json::from_str::<StepsPerLevel>(r#""ten""#).is_err());
        assert!(serde_json::from_str::<StepsPerLevel>(r#"{"steps": 3}"#).is_err());
        assert!(serde_json::from_str::<StepsPerLevel>("2.5").is_err());
    }
}
