//! Error types for docforge.
//!
//! Library crates use [`DocforgeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all docforge operations.
#[derive(Debug, thiserror::Error)]
pub enum DocforgeError {
    /// A referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// An operation was attempted on a job not in the required status.
    /// Caller bug — re-triggering with the same arguments will not help.
    #[error("invalid job state: expected {expected}, found {actual}")]
    InvalidState { expected: String, actual: String },

    /// Per-URL scrape failure. Non-fatal for content jobs — accumulated
    /// on the job alongside successful snapshots.
    #[error("scrape error: {0}")]
    Scrape(String),

    /// Generation-service call failed (network, HTTP, or response shape).
    #[error("generation error: {0}")]
    Generation(String),

    /// Generated output failed required-field or range validation.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Persistence failure during a transactional apply step.
    #[error("apply error: {0}")]
    Apply(String),

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocforgeError>;

impl DocforgeError {
    /// Create a not-found error for an entity kind and id.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create an invalid-state error from the expected and actual statuses.
    pub fn invalid_state(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::InvalidState {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether re-running the failed operation can succeed without
    /// operator intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Scrape(_) | Self::Generation(_) | Self::Apply(_) | Self::Storage(_)
        )
    }
}
