//! Error types for Payscope.
//!
//! Library crates use [`PayscopeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Payscope operations.
#[derive(Debug, thiserror::Error)]
pub enum PayscopeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Inference service error (HTTP, API, or response parsing).
    /// Fatal to a run: the pipeline has no heuristic fallback.
    #[error("inference error: {0}")]
    Inference(String),

    /// Search provider error. Recoverable per query: the web-evidence
    /// stage treats this as an empty result set for that query.
    #[error("search error: {0}")]
    Search(String),

    /// Similarity index or backing store error.
    #[error("index error: {0}")]
    Index(String),

    /// A stage was invoked without a required input field.
    #[error("stage '{stage}' precondition failed: {message}")]
    Precondition {
        stage: &'static str,
        message: String,
    },

    /// Invalid stage graph construction (e.g., concurrently scheduled
    /// stages declaring overlapping output fields). Raised before any
    /// run executes.
    #[error("topology error: {0}")]
    Topology(String),

    /// Data validation error (schema mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PayscopeError>;

impl PayscopeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a precondition error for a named stage.
    pub fn precondition(stage: &'static str, msg: impl Into<String>) -> Self {
        Self::Precondition {
            stage,
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
}
