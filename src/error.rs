// src/error.rs
//
// Error taxonomy shared by every backend and command.

use thiserror::Error;

/// Convenience alias used across the crate.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors produced by locator parsing, backends and commands.
///
/// Callers branch on the kind (see [`StorageError::is_not_found`]), never on
/// the message text.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("malformed locator `{0}`: expected gs://BUCKET[/PATH]")]
    MalformedLocator(String),

    /// The object or bucket does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The run was aborted because a sibling operation failed.
    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Any other failure reported by the storage backend.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StorageError::Cancelled)
    }

    /// True when stdout went away underneath us (e.g. piped into `head`).
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, StorageError::Io(e) if e.kind() == std::io::ErrorKind::BrokenPipe)
    }
}
