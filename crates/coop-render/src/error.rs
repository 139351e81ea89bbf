//! Error types for the animation engine

use thiserror::Error;

/// Errors raised by the fixture registry and render configuration
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    /// Fixture is not part of the configured installation order
    #[error("unknown fixture: {0}")]
    UnknownFixture(String),

    /// Configuration value out of range
    #[error("invalid render config: {0}")]
    InvalidConfig(String),
}

/// Failure reported by a [`crate::BulbDriver`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The driver lost its connection to the fixture
    #[error("fixture {0} unreachable")]
    Unreachable(String),

    /// Any other transport failure
    #[error("driver error: {0}")]
    Transport(String),
}
