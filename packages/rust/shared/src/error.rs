//! Error types for the outreach pipeline.
//!
//! Library crates use [`OutreachError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! A failed email validation check is *not* an error: it is reported as a
//! [`ValidationResult`](crate::ValidationResult) with `is_valid = false`.

use std::path::PathBuf;

/// Top-level error type for all outreach operations.
#[derive(Debug, thiserror::Error)]
pub enum OutreachError {
    /// Missing credentials or required input. Fatal for a whole campaign.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network failure, non-2xx response, or timeout from an external API.
    #[error("provider error: {0}")]
    Provider(String),

    /// Malformed or unexpected payload from an external API.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Caller-supplied data is unusable (bad URL, empty topic, ...).
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
pub type Result<T> = std::result::Result<T, OutreachError>;

impl OutreachError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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

    /// Whether this error must abort a whole campaign rather than one item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}
