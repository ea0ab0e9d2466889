//! Action, observation and goal spaces.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An observation as seen by an agent.
pub type Observation = Vec<f32>;

/// An action emitted by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    /// Index into a discrete space
    Discrete(usize),
    /// Point in a continuous space
    Continuous(Vec<f32>),
}

impl Action {
    /// Converts this action into a goal vector for the level below.
    pub fn as_goal(&self) -> Vec<f32> {
        match self {
            Action::Discrete(index) => vec![*index as f32],
            Action::Continuous(values) => values.clone(),
        }
    }
}

/// The set of values an action, observation or goal can take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Space {
    /// `n` distinct actions, indexed `0..n`
    Discrete { n: usize },
    /// Axis-aligned box with per-dimension bounds
    Continuous { low: Vec<f32>, high: Vec<f32> },
}

/// Error for malformed space bounds or values of the wrong shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpaceError {
    #[error("discrete space must have at least one action")]
    EmptyDiscrete,
    #[error("bounds length mismatch: low has {low}, high has {high}")]
    BoundsLengthMismatch { low: usize, high: usize },
    #[error("low bound exceeds high bound in dimension {dimension}")]
    InvertedBounds { dimension: usize },
    #[error("value has {actual} dimensions but the space has {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl Space {
    /// Creates a discrete space with `n` actions.
    pub fn discrete(n: usize) -> Result<Self, SpaceError> {
        let space = Space::Discrete { n };
        space.validate()?;
        Ok(space)
    }

    /// Creates a continuous box space.
    pub fn continuous(low: Vec<f32>, high: Vec<f32>) -> Result<Self, SpaceError> {
        let space = Space::Continuous { low, high };
        space.validate()?;
        Ok(space)
    }

    /// Checks that the space is well formed.
    pub fn validate(&self) -> Result<(), SpaceError> {
        match self {
            Space::Discrete { n } if *n == 0 => Err(SpaceError::EmptyDiscrete),
            Space::Discrete { .. } => Ok(()),
            Space::Continuous { low, high } => {
                if low.len() != high.len() {
                    return Err(SpaceError::BoundsLengthMismatch {
                        low: low.len(),
                        high: high.len(),
                    });
                }
                match low.iter().zip(high).position(|(l, h)| l > h) {
                    Some(dimension) => Err(SpaceError::InvertedBounds { dimension }),
                    None => Ok(()),
                }
            }
        }
    }

    /// Number of values needed to describe one element of this space.
    pub fn dimension(&self) -> usize {
        match self {
            Space::Discrete { .. } => 1,
            Space::Continuous { low, .. } => low.len(),
        }
    }

    /// Returns true if the action lies inside this space.
    pub fn contains(&self, action: &Action) -> bool {
        match (self, action) {
            (Space::Discrete { n }, Action::Discrete(index)) => index < n,
            (Space::Continuous { low, high }, Action::Continuous(values)) => {
                values.len() == low.len()
                    && values
                        .iter()
                        .zip(low.iter().zip(high))
                        .all(|(v, (l, h))| v >= l && v <= h)
            }
            _ => false,
        }
    }

    /// Draws a uniformly random element of the space.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Action {
        match self {
            Space::Discrete { n } => Action::Discrete(rng.gen_range(0..(*n).max(1))),
            Space::Continuous { low, high } => Action::Continuous(
                low.iter()
                    .zip(high)
                    .map(|(&l, &h)| if l < h { rng.gen_range(l..=h) } else { l })
                    .collect(),
            ),
        }
    }

    /// Clamps a vector into the bounds of a continuous space.
    ///
    /// Discrete spaces return the values unchanged. Fails if the vector does
    /// not have exactly [`Space::dimension`] entries.
    pub fn clip(&self, values: Vec<f32>) -> Result<Vec<f32>, SpaceError> {
        if values.len() != self.dimension() {
            return Err(SpaceError::DimensionMismatch {
                expected: self.dimension(),
                actual: values.len(),
            });
        }
        match self {
            Space::Discrete { .. } => Ok(values),
            Space::Continuous { low, high } => Ok(values
                .into_iter()
                .zip(low.iter().zip(high))
                .map(|(v, (&l, &h))| v.max(l).min(h))
                .collect()),
        }
    }
}

/// The spaces an agent sees when it is attached to a lower environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacesDefinition {
    /// What the agent observes
    pub observation: Space,
    /// What the agent may emit
    pub action: Space,
    /// What the level above may ask this agent to reach
    pub goal: Space,
}

impl SpacesDefinition {
    /// Builds the spaces for an agent controlling an environment with the given
    /// spaces. Goals default to points in the observation space.
    pub fn for_environment(observation: Space, action: Space) -> Self {
        Self {
            goal: observation.clone(),
            observation,
            action,
        }
    }
}
