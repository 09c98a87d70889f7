//! Error types for file and tag operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while resolving, validating or transferring entries.
#[derive(Debug, Error)]
pub enum OpsError {
    /// The destination is already occupied.
    #[error("Already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// A handle, path or trash record could not be resolved.
    #[error("Not found: {path}")]
    NotFound { path: PathBuf },

    /// The location cannot be resolved to a writable local path.
    #[error("The path is not writable: {path}")]
    NotWritable { path: PathBuf },

    /// Structural naming violation.
    #[error("Invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// A same-kind entry already sits at the validated target.
    #[error("Name collision at {path}")]
    NameCollision { path: PathBuf },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A copy or move destination lies inside its own source tree.
    #[error("Cannot place {path} inside itself at {destination}")]
    DestinationInsideSource { path: PathBuf, destination: PathBuf },

    /// Every probed duplicate name was taken.
    #[error("No free name available next to {path}")]
    NoAvailableName { path: PathBuf },

    /// The background task died before reporting.
    #[error("Task failed: {message}")]
    TaskFailed { message: String },
}

impl OpsError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create a not found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create an already exists error.
    pub fn already_exists(path: impl Into<PathBuf>) -> Self {
        Self::AlreadyExists { path: path.into() }
    }

    /// Whether this is an `AlreadyExists` error.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Whether this is a `NotFound` error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
