//! Error types for the coordinator.

use thiserror::Error;

/// Coordinator-specific errors.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Agent error.
    #[error("agent error: {0}")]
    Agent(#[from] tandem_agent::AgentError),

    /// Transport error that survived local recovery.
    #[error("transport error: {0}")]
    Transport(#[from] tandem_agent::TransportError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for coordinator operations.
pub type Result<T> = std::result::Result<T, CoordinatorError>;
