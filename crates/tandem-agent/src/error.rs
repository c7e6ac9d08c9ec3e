//! Error types for the agent crate.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors that can occur in agent operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Model invocation failed.
    #[error("model invocation failed: {0}")]
    Generation(String),

    /// Response parsing failed.
    #[error("failed to parse response: {0}")]
    ResponseParse(String),

    /// Transport operation failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Durable store operation failed.
    #[error("history store error: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
