//! Error types for Sift core operations.
//!
//! The search path itself never returns these to callers: invalid patterns
//! are resolved locally into an empty result plus a diagnostic strategy.
//! Configuration loading and document loading propagate them normally, and
//! higher-level code can wrap them with `anyhow`.

use thiserror::Error;

/// Result type alias using SiftError
pub type Result<T> = std::result::Result<T, SiftError>;

/// Core error types for Sift operations.
#[derive(Error, Debug)]
pub enum SiftError {
    // === Query Errors ===
    /// The pattern could not be compiled into a matcher
    #[error("invalid search pattern: {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // === Configuration Errors ===
    /// Configuration file parsing or validation failed
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    // === Input Errors ===
    /// Input documents were not a JSON array of values
    #[error("invalid documents: {reason}")]
    InvalidDocuments { reason: String },

    // === I/O Errors ===
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Internal Errors ===
    /// Internal error that should not happen
    #[error("internal error: {0}")]
    Internal(String),
}

impl SiftError {
    /// Returns true if this error was caused by the query rather than the
    /// environment (the caller should fix the pattern, not retry).
    pub fn is_query_error(&self) -> bool {
        matches!(self, SiftError::InvalidPattern { .. })
    }

    /// Returns true if this error is recoverable (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SiftError::Io(_))
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        SiftError::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        SiftError::ConfigError {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for SiftError {
    fn from(err: serde_json::Error) -> Self {
        SiftError::InvalidDocuments {
            reason: err.to_string(),
        }
    }
}
