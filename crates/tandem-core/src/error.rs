//! Error types for the core crate.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A cached segment was not found or has expired.
    #[error("segment not found: {0}")]
    SegmentNotFound(String),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
