//! Error types for manifest construction and installer packaging.
//!
//! Provides the [`Error`] enum shared by the manifest engine and the
//! platform packagers, plus extension traits for attaching context.

use std::{
    fmt::Display,
    io,
    path::{Path, PathBuf},
};
use thiserror::Error as DeriveError;

/// Result type alias for bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while staging files or producing an installer artifact.
#[derive(Debug, DeriveError)]
pub enum Error {
    /// Plain I/O failure without path context.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// I/O failure annotated with the action and the path involved.
    #[error("{action} {}: {source}", path.display())]
    Fs {
        /// What was being attempted
        action: String,
        /// Path the action touched
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Invalid glob pattern handed to a copy rule.
    #[error("invalid pattern {pattern:?}: {message}")]
    GlobPattern {
        /// Offending pattern
        pattern: String,
        /// Parser message
        message: String,
    },

    /// A strict copy rule matched nothing.
    #[error("no files match {}", pattern.display())]
    MissingSource {
        /// Pattern as resolved against the source and build roots
        pattern: PathBuf,
    },

    /// An absolute target was handed to the relative-only symlink form.
    #[error(
        "refusing to create symlink {} -> absolute target {}",
        link.display(),
        target.display()
    )]
    AbsoluteSymlink {
        /// Link location
        link: PathBuf,
        /// Absolute target that was refused
        target: PathBuf,
    },

    /// More prefix scopes were closed than opened.
    #[error("prefix stack underflow: no scope left to close")]
    PrefixUnderflow,

    /// An external tool could not be spawned.
    #[error("failed to run {command}: {error}")]
    CommandFailed {
        /// Program name
        command: String,
        /// Spawn error
        error: io::Error,
    },

    /// An external tool exited unsuccessfully.
    #[error("{command} exited with status {code:?}: {stderr}")]
    CommandStatus {
        /// Program name
        command: String,
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// A retried operation failed on every attempt.
    #[error("{operation} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Operation label
        operation: String,
        /// Attempts made
        attempts: u32,
        /// Error from the final attempt
        last: Box<Error>,
    },

    /// Handlebars template error.
    #[error("template error: {0}")]
    Template(String),

    /// Property list read/write error.
    #[error("plist error: {0}")]
    Plist(#[from] plist::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Settings failed validation.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Architecture not handled by the selected platform.
    #[error("unsupported architecture: {0}")]
    ArchError(String),

    /// Anything else.
    #[error("{0}")]
    GenericError(String),
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(Path::to_path_buf).unwrap_or_default();
        match err.into_io_error() {
            Some(source) => Error::Fs {
                action: "walking".into(),
                path,
                source,
            },
            None => Error::GenericError(format!("filesystem loop at {}", path.display())),
        }
    }
}

impl From<std::path::StripPrefixError> for Error {
    fn from(err: std::path::StripPrefixError) -> Self {
        Error::GenericError(err.to_string())
    }
}

/// Attaches filesystem context to I/O results.
pub trait ErrorExt<T> {
    /// Wraps the error with the action being performed and the path.
    fn fs_context(self, action: &str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, io::Error> {
    fn fs_context(self, action: &str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|source| Error::Fs {
            action: action.to_string(),
            path: path.as_ref().to_path_buf(),
            source,
        })
    }
}

/// Converts options and foreign errors into [`Error`] with a message.
pub trait Context<T> {
    /// Adds a static message.
    fn context<C: Display>(self, context: C) -> Result<T>;

    /// Adds a lazily built message.
    fn with_context<C: Display, F: FnOnce() -> C>(self, f: F) -> Result<T>;
}

impl<T> Context<T> for Option<T> {
    fn context<C: Display>(self, context: C) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C: Display, F: FnOnce() -> C>(self, f: F) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

impl<T> Context<T> for Result<T> {
    fn context<C: Display>(self, context: C) -> Result<T> {
        self.map_err(|e| Error::GenericError(format!("{context}: {e}")))
    }

    fn with_context<C: Display, F: FnOnce() -> C>(self, f: F) -> Result<T> {
        self.map_err(|e| Error::GenericError(format!("{}: {e}", f())))
    }
}

/// Returns early with a [`Error::GenericError`] built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($($arg)*)))
    };
}
