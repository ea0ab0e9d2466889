//! Sample presets for testing.
//!
//! This module provides ready-made configuration for other crates to use.
//! Enable the `test-fixtures` feature to access these helpers.
//!
//! # Example
//!
//! ```ignore
//! // In your Cargo.toml:
//! // [dev-dependencies]
//! // hac-types = { path = "../hac-types", features = ["test-fixtures"] }
//!
//! use hac_types::fixtures;
//!
//! let preset = fixtures::two_level_preset();
//! assert_eq!(preset.levels(), 2);
//! ```

use crate::{AgentParameters, EnvironmentParameters, Preset};

/// Returns the two-level chain preset.
///
/// - shared step budget of 5 for the bottom level
/// - chain of length 8, episodes capped at 60 steps
/// - both levels use the `random` agent with no explicit filters
pub fn two_level_preset() -> Preset {
    let toml = include_str!("../tests/fixtures/two_level_chain.toml");
    Preset::from_str(toml).expect("Failed to parse two_level_chain.toml")
}

/// Returns the three-level chain preset.
///
/// - per-level step budgets `[1, 4, 3]`
/// - environment default filters set for rewards and actions
/// - the middle level carries an explicit observation filter
pub fn three_level_preset() -> Preset {
    let toml = include_str!("../tests/fixtures/three_level_chain.toml");
    Preset::from_str(toml).expect("Failed to parse three_level_chain.toml")
}

/// Returns `levels` copies of agent parameters for the given component.
pub fn agent_stack(component: &str, levels: usize) -> Vec<AgentParameters> {
    (0..levels).map(|_| AgentParameters::new(component)).collect()
}

/// Returns chain environment parameters with identity filters.
pub fn chain_environment() -> EnvironmentParameters {
    EnvironmentParameters::new("chain")
}
