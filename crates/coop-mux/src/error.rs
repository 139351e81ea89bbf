//! Error types for the coordinator

use coop_render::RenderError;
use thiserror::Error;

/// Invalid coordinator configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The backoff table has no entries
    #[error("backoff table is empty")]
    EmptyBackoff,

    /// A periodic interval is zero
    #[error("{name} must be greater than zero")]
    ZeroInterval {
        /// Name of the offending setting
        name: &'static str,
    },

    /// A channel names an empty controller id
    #[error("channel {0} is mapped to an empty controller id")]
    EmptyController(coop_render::Channel),

    /// Render settings out of range
    #[error("render config: {0}")]
    Render(#[from] RenderError),
}

/// Errors reported by the coordinator
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Configuration rejected at startup
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The coordinator task is gone
    #[error("coordinator task has stopped")]
    Stopped,
}
