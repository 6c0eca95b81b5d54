//! Error types for Newsroom.
//!
//! Library crates use [`NewsroomError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Newsroom operations.
#[derive(Debug, thiserror::Error)]
pub enum NewsroomError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The generation service produced no usable result after every fallback.
    #[error("generation error: {0}")]
    Generation(String),

    /// Structured text (YAML, JSON, front matter) could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Knowledge-base store read or write error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (unknown category, malformed batch, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, NewsroomError>;

impl NewsroomError {
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
        let err = NewsroomError::config("no API keys configured");
        assert_eq!(err.to_string(), "config error: no API keys configured");

        let err = NewsroomError::validation("category 'sports' is not recognized");
        assert!(err.to_string().contains("sports"));
    }

    #[test]
    fn io_error_keeps_path() {
        let err = NewsroomError::io(
            "/tmp/missing.yml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("missing.yml"));
        assert!(msg.contains("gone"));
    }
}
