//! Input and output filters.
//!
//! An input filter transforms observations and rewards on their way into an
//! agent. An output filter transforms actions on their way out. An empty
//! filter is the identity, which is what most environments use by default.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::space::Action;

/// A filter that cannot be applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("{kind} clip bounds [{min}, {max}] are not an ordered pair of numbers")]
    InvalidClipBounds { kind: &'static str, min: f64, max: f64 },
}

fn check_clip(kind: &'static str, min: f64, max: f64) -> Result<(), FilterError> {
    // NaN fails both comparisons
    if min <= max {
        Ok(())
    } else {
        Err(FilterError::InvalidClipBounds { kind, min, max })
    }
}

/// One observation transformation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObservationFilter {
    /// Clamp every component into `[min, max]`
    Clip { min: f32, max: f32 },
    /// Multiply every component by `factor`
    Scale { factor: f32 },
}

impl ObservationFilter {
    fn apply(&self, value: f32) -> f32 {
        match self {
            ObservationFilter::Clip { min, max } => value.max(*min).min(*max),
            ObservationFilter::Scale { factor } => value * factor,
        }
    }

    fn validate(&self) -> Result<(), FilterError> {
        match self {
            ObservationFilter::Clip { min, max } => check_clip("observation", *min as f64, *max as f64),
            ObservationFilter::Scale { .. } => Ok(()),
        }
    }
}

/// One reward transformation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardFilter {
    /// Clamp the reward into `[min, max]`
    Clip { min: f64, max: f64 },
    /// Multiply the reward by `factor`
    Rescale { factor: f64 },
}

impl RewardFilter {
    fn apply(&self, reward: f64) -> f64 {
        match self {
            RewardFilter::Clip { min, max } => reward.max(*min).min(*max),
            RewardFilter::Rescale { factor } => reward * factor,
        }
    }

    fn validate(&self) -> Result<(), FilterError> {
        match self {
            RewardFilter::Clip { min, max } => check_clip("reward", *min, *max),
            RewardFilter::Rescale { .. } => Ok(()),
        }
    }
}

/// One action transformation step. Discrete actions pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionFilter {
    /// Clamp every component into `[min, max]`
    Clip { min: f32, max: f32 },
    /// Multiply every component by `factor`
    Scale { factor: f32 },
}

impl ActionFilter {
    fn apply(&self, value: f32) -> f32 {
        match self {
            ActionFilter::Clip { min, max } => value.max(*min).min(*max),
            ActionFilter::Scale { factor } => value * factor,
        }
    }

    fn validate(&self) -> Result<(), FilterError> {
        match self {
            ActionFilter::Clip { min, max } => check_clip("action", *min as f64, *max as f64),
            ActionFilter::Scale { .. } => Ok(()),
        }
    }
}

/// Filters applied to everything an agent receives.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFilter {
    /// Applied in order to each observation
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub observation: Vec<ObservationFilter>,
    /// Applied in order to each reward
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reward: Vec<RewardFilter>,
}

impl InputFilter {
    /// The identity filter.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Returns true if this filter changes nothing.
    pub fn is_identity(&self) -> bool {
        self.observation.is_empty() && self.reward.is_empty()
    }

    /// Checks every filter in the chain.
    pub fn validate(&self) -> Result<(), FilterError> {
        self.observation.iter().try_for_each(ObservationFilter::validate)?;
        self.reward.iter().try_for_each(RewardFilter::validate)
    }

    /// Runs an observation through every observation filter.
    pub fn filter_observation(&self, mut observation: Vec<f32>) -> Vec<f32> {
        for filter in &self.observation {
            for value in observation.iter_mut() {
                *value = filter.apply(*value);
            }
        }
        observation
    }

    /// Runs a reward through every reward filter.
    pub fn filter_reward(&self, reward: f64) -> f64 {
        self.reward.iter().fold(reward, |r, filter| filter.apply(r))
    }
}

/// Filters applied to everything an agent emits.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputFilter {
    /// Applied in order to each continuous action
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub action: Vec<ActionFilter>,
}

impl OutputFilter {
    /// The identity filter.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Returns true if this filter changes nothing.
    pub fn is_identity(&self) -> bool {
        self.action.is_empty()
    }

    /// Checks every filter in the chain.
    pub fn validate(&self) -> Result<(), FilterError> {
        self.action.iter().try_for_each(ActionFilter::validate)
    }

    /// Runs an action through every action filter.
    pub fn filter_action(&self, action: Action) -> Action {
        match action {
            Action::Discrete(index) => Action::Discrete(index),
            Action::Continuous(mut values) => {
                for filter in &self.action {
                    for value in values.iter_mut() {
                        *value = filter.apply(*value);
                    }
                }
                Action::Continuous(values)
            }
        }
    }
}
