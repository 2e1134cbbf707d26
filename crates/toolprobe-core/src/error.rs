//! Error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types organized by layer
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // Descriptor Input Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Expected directory to be a non-empty path")]
    InvalidDirectory,

    #[error("Directory does not exist: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Directory does not contain {tool}: {path}")]
    NotAnInstallation { tool: &'static str, path: PathBuf },

    // ─────────────────────────────────────────────────────────────
    // Search Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Cannot enumerate search root {path}: {reason}")]
    SearchRoot { path: PathBuf, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Watch Errors
    // ─────────────────────────────────────────────────────────────
    #[error("File watcher error: {message}")]
    Watch { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn directory_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DirectoryNotFound { path: path.into() }
    }

    pub fn not_an_installation(tool: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::NotAnInstallation {
            tool,
            path: path.into(),
        }
    }

    pub fn search_root(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SearchRoot {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn watch(message: impl Into<String>) -> Self {
        Self::Watch {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this error was caused by bad input to a descriptor constructor
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidDirectory
                | Error::DirectoryNotFound { .. }
                | Error::NotAnInstallation { .. }
        )
    }

    /// Check if this error ends a watch session
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Watch { .. })
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
