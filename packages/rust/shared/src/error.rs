//! Error types for the matrikkel workspace.
//!
//! Library crates use [`MatrikkelError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all enrichment operations.
#[derive(Debug, thiserror::Error)]
pub enum MatrikkelError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Value or filename parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Cache layer error (serialization, rename).
    #[error("storage error: {0}")]
    Storage(String),

    /// Workbook could not be opened or the sheet is unreadable.
    #[error("workbook error: {0}")]
    Workbook(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (unknown data source, bad code, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MatrikkelError>;

impl MatrikkelError {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = MatrikkelError::config("missing raw_dir");
        assert_eq!(err.to_string(), "config error: missing raw_dir");

        let err = MatrikkelError::validation("unknown data source 'foo'");
        assert!(err.to_string().contains("unknown data source"));
    }

    #[test]
    fn io_error_keeps_path() {
        let err = MatrikkelError::io(
            "/tmp/missing.xlsx",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("missing.xlsx"));
    }
}
