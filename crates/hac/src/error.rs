//! Errors raised while building or driving a hierarchy.

use hac_types::ConfigError;
use thiserror::Error;

/// Error type returned by user-supplied agents and environments.
pub type ComponentError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias for agent and environment operations.
pub type ComponentResult<T> = Result<T, ComponentError>;

/// Which registry table a component tag was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Agent,
    Environment,
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentKind::Agent => write!(f, "agent"),
            ComponentKind::Environment => write!(f, "environment"),
        }
    }
}

/// Errors that can occur in graph operations.
#[derive(Debug, Error)]
pub enum HacError {
    /// Invalid hierarchy configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// No constructor registered under the requested tag
    #[error("no {kind} registered under '{tag}' (known: {known})")]
    UnknownComponent {
        kind: ComponentKind,
        tag: String,
        known: String,
    },

    /// Failure inside an agent or environment, passed through unchanged
    #[error(transparent)]
    Component(ComponentError),

    /// The graph was driven before it had any levels
    #[error("graph has no level managers")]
    EmptyGraph,
}

impl HacError {
    /// Returns the underlying component error, if this is one.
    pub fn as_component(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            HacError::Component(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<ComponentError> for HacError {
    fn from(e: ComponentError) -> Self {
        HacError::Component(e)
    }
}
