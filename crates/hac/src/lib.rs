//! Hierarchical Actor-Critic graph construction.
//!
//! Turns a list of per-level agent configurations and one environment
//! configuration into a stack of level managers. Each level manager wraps one
//! agent and the level beneath it, so the stack as a whole looks like a single
//! environment to the level above.
//!
//! # Architecture
//!
//! ```text
//!            level_0 (top, 1 step per call)
//!               │ goals
//!               ▼
//!            level_1 (N steps per goal)
//!               │ goals
//!               ▼
//!            level_2 (M steps per goal)
//!               │ actions
//!               ▼
//!          real environment
//! ```
//!
//! # Modules
//!
//! - [`graph_manager`]: Configuration validation and bottom-up construction
//! - [`level_manager`]: One agent plus its lower environment, as an environment
//! - [`registry`]: Tag-to-constructor tables replacing dynamic class loading
//! - [`graph`]: The constructed hierarchy and a simple driver
//! - [`builtins`]: A chain environment and a random agent

pub mod agent;
pub mod builtins;
pub mod environment;
pub mod error;
pub mod graph;
pub mod graph_manager;
pub mod level_manager;
pub mod registry;

pub use agent::{Agent, Transition};
pub use builtins::{BuiltinError, ChainEnvironment, RandomAgent};
pub use environment::{same_instance, share, EnvHandle, EnvResponse, Environment};
pub use error::{ComponentError, ComponentKind, ComponentResult, HacError};
pub use graph::{ActSummary, Graph, GraphSummary, LevelSummary, SharedLevelManager};
pub use graph_manager::{BasicRlGraphManager, GraphManager, HacGraphManager};
pub use level_manager::{LevelManager, SubGoalTesting};
pub use registry::{AgentFactory, ComponentRegistry, EnvironmentFactory};

// Re-export the configuration crate so callers need a single dependency
pub use hac_types;
