//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The named file does not exist in the directory.
    #[error("file not found: {file}")]
    NotFound {
        /// The missing file name.
        file: String,
    },

    /// Attempted to read beyond the end of a file.
    #[error("read beyond end of {file}: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The file being read.
        file: String,
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current file size.
        size: u64,
    },

    /// The file name is not a plain name within the directory.
    #[error("invalid file name: {0:?}")]
    InvalidFileName(String),

    /// An argument was out of range for the file.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Another process holds the directory lock.
    #[error("directory locked: another process has exclusive access")]
    Locked,
}

impl StorageError {
    /// Creates a not-found error for `file`.
    pub fn not_found(file: impl Into<String>) -> Self {
        Self::NotFound { file: file.into() }
    }

    /// Returns true if this error means the file does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
