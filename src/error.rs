//! Error types for handlestore
//!
//! Provides a unified error type for all operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for handlestore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // -------------------------------------------------------------------------
    // Path Errors
    // -------------------------------------------------------------------------
    #[error("File {} already exists", .0.display())]
    AlreadyExists(PathBuf),

    #[error("File {} does not exist", .0.display())]
    DoesNotExist(PathBuf),

    #[error("{} is a directory and not a file", .0.display())]
    NotAFile(PathBuf),

    #[error("Unable to manage a directory: {}", .0.display())]
    IsDirectory(PathBuf),

    #[error("{} exists and is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("Invalid resource name: {0:?}")]
    InvalidName(String),

    // -------------------------------------------------------------------------
    // Materialization Errors
    // -------------------------------------------------------------------------
    #[error("Resource has not been loaded")]
    NotLoaded,

    #[error("Resource {} is already loaded", .0.display())]
    AlreadyLoaded(PathBuf),

    #[error("Resource {} is allocated but not initialized", .0.display())]
    NotInitialized(PathBuf),

    #[error("Resource {} has been closed", .0.display())]
    Closed(PathBuf),

    // -------------------------------------------------------------------------
    // Manager Errors
    // -------------------------------------------------------------------------
    #[error("Unable to manage file with duplicate name: {0}")]
    DuplicateName(String),

    #[error("Unable to link {} to {}: {source}", .from.display(), .to.display())]
    LinkFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to close directory {}: {source}", .path.display())]
    CloseFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Unknown storage topic: {0}")]
    UnknownTopic(String),

    #[error("Error opening the following topics: {0:?}")]
    Topics(Vec<String>),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Recover a StoreError that was carried through an `io::Error`
    /// (stream operations on resources report `NotLoaded` this way).
    pub fn from_io(err: &io::Error) -> Option<&StoreError> {
        err.get_ref()?.downcast_ref::<StoreError>()
    }
}

impl From<StoreError> for io::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
