//! Error types for the Tollgate admission-control layer.

use thiserror::Error;

/// Main error type for Tollgate operations.
///
/// Admission refusal is deliberately absent: a refused request is a normal
/// decision outcome surfaced through the pipeline, not an error.
#[derive(Error, Debug)]
pub enum TollgateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed inbound requests at the transport boundary
    #[error("Malformed request: {0}")]
    Http(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Tollgate operations.
pub type Result<T> = std::result::Result<T, TollgateError>;
