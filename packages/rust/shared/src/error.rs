//! Error types for examplegen.
//!
//! Library crates use [`ExampleGenError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all examplegen operations.
#[derive(Debug, thiserror::Error)]
pub enum ExampleGenError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A notebook could not be parsed or is missing its metadata section.
    #[error("notebook error at {path:?}: {message}")]
    Notebook { path: PathBuf, message: String },

    /// A discovery glob pattern could not be compiled.
    #[error("invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// Data validation error (bad path shape, unknown category, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ExampleGenError>;

impl ExampleGenError {
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

    /// Create a notebook error for the given file.
    pub fn notebook(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Notebook {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a pattern error for a glob that failed to compile.
    pub fn pattern(pattern: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
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
        let err = ExampleGenError::config("unknown category 'widgets'");
        assert_eq!(err.to_string(), "config error: unknown category 'widgets'");

        let err = ExampleGenError::notebook("a/b.ipynb", "missing metadata");
        assert!(err.to_string().contains("a/b.ipynb"));
        assert!(err.to_string().contains("missing metadata"));

        let err = ExampleGenError::pattern("jobs/[", "unclosed class");
        assert!(err.to_string().starts_with("invalid pattern 'jobs/['"));
    }

    #[test]
    fn io_error_keeps_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ExampleGenError::io("prefix.md", source);
        assert!(err.to_string().contains("prefix.md"));
        assert!(err.to_string().contains("gone"));
    }
}
