//! Error types for ethoflux

use thiserror::Error;

/// Errors that can occur while extracting, linking or aggregating events
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("No session metadata for animal: {0}")]
    MissingMetadata(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
