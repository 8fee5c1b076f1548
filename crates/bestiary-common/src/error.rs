//! Error types for Genesis Bestiary.
//!
//! Gameplay code never fails at runtime; these errors only surface while
//! loading authored definitions and configuration before a hunt starts.

use thiserror::Error;

/// Top-level error type for Bestiary operations.
#[derive(Debug, Error)]
pub enum BestiaryError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A definition or config document could not be parsed
    #[error("Failed to parse {path}: {message}")]
    Parse {
        /// Source of the document
        path: String,
        /// Parser message
        message: String,
    },

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Actual version found
        actual: String,
    },

    /// A definition parsed but violates a constraint
    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),
}

/// Result type alias for Bestiary operations.
pub type BestiaryResult<T> = Result<T, BestiaryError>;
