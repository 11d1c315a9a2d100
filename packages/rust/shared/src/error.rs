//! Error types for docrouter.
//!
//! Library crates use [`DocRouterError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all docrouter operations.
#[derive(Debug, thiserror::Error)]
pub enum DocRouterError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to the LLM capability.
    #[error("network error: {0}")]
    Network(String),

    /// JSON or document parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Context store error.
    #[error("storage error: {0}")]
    Storage(String),

    /// LLM capability error (unavailable, timed out, off-schema response).
    #[error("llm error: {0}")]
    Llm(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (unexpected shape, invalid label, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Binary decoding error (PDF text layer, base64 payload).
    #[error("extraction error: {0}")]
    Extraction(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocRouterError>;

impl DocRouterError {
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
        let err = DocRouterError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = DocRouterError::validation("label 'Refund' is not a candidate intent");
        assert!(err.to_string().contains("Refund"));

        let err = DocRouterError::Llm("timed out after 30s".into());
        assert_eq!(err.to_string(), "llm error: timed out after 30s");
    }

    #[test]
    fn io_error_keeps_path() {
        let err = DocRouterError::io(
            "/tmp/missing.pdf",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("missing.pdf"));
    }
}
