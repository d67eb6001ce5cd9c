//! Error types for the datalog engine.

use datalog_storage::StorageError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in datalog core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage directory error not attributable to a more specific kind.
    #[error("storage error: {0}")]
    Storage(#[source] StorageError),

    /// Variable name failed validation.
    #[error("invalid variable name {name:?}: {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Record size outside `(0, max]`.
    #[error("invalid record size {size}: must be between 1 and {max}")]
    InvalidRecordSize {
        /// The requested size.
        size: usize,
        /// The configured maximum.
        max: usize,
    },

    /// Requested record count is zero.
    #[error("invalid record count: must be at least 1")]
    InvalidCount,

    /// An empty record was appended.
    #[error("empty record for {name}")]
    EmptyRecord {
        /// The variable name.
        name: String,
    },

    /// Configuration values are inconsistent.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// No registration exists for the variable.
    #[error("variable not registered: {name}")]
    NotRegistered {
        /// The variable name.
        name: String,
    },

    /// The persisted record size is unreadable or non-positive.
    #[error("corrupt registration for {name}: {message}")]
    CorruptRegistration {
        /// The variable name.
        name: String,
        /// Description of the corruption.
        message: String,
    },

    /// The variable is already registered with a different record size.
    #[error("{name} already registered with record size {existing} (requested {requested})")]
    AlreadyRegistered {
        /// The variable name.
        name: String,
        /// The size on record.
        existing: usize,
        /// The size requested by the caller.
        requested: usize,
    },

    /// The persisted log index cannot be read or written.
    #[error("log index unavailable for {name}: {message}")]
    IndexUnavailable {
        /// The variable name.
        name: String,
        /// Description of the failure.
        message: String,
    },

    /// Appended data is longer than the registered record size.
    #[error("record of {len} bytes exceeds registered size {record_size} for {name}")]
    RecordTooLarge {
        /// The variable name.
        name: String,
        /// Length of the supplied data.
        len: usize,
        /// The registered record size.
        record_size: usize,
    },

    /// A segment could not be opened or created.
    #[error("cannot open segment {file}: {source}")]
    SegmentOpenFailed {
        /// The segment file name.
        file: String,
        /// Underlying storage error.
        #[source]
        source: StorageError,
    },

    /// Writing or syncing a record failed.
    #[error("write to {file} failed: {source}")]
    WriteFailed {
        /// The segment file name.
        file: String,
        /// Underlying storage error.
        #[source]
        source: StorageError,
    },

    /// Reading a record failed.
    #[error("read from {file} failed: {source}")]
    ReadFailed {
        /// The segment file name.
        file: String,
        /// Underlying storage error.
        #[source]
        source: StorageError,
    },

    /// The oldest segment could not be deleted. Never fatal to an append.
    #[error("eviction of segment {index} of {name} failed: {source}")]
    EvictionFailed {
        /// The variable name.
        name: String,
        /// Index of the segment that should have been deleted.
        index: u64,
        /// Underlying storage error.
        #[source]
        source: StorageError,
    },

    /// Another process holds the logging directory.
    #[error("directory locked: another process has exclusive access")]
    DirectoryLocked,

    /// A read was performed without priming.
    #[error("no primed read")]
    NoPrimedRead,

    /// The read buffer length differs from the primed byte count.
    #[error("primer mismatch: primed for {expected} bytes, buffer holds {actual}")]
    PrimerMismatch {
        /// Byte count computed when priming.
        expected: usize,
        /// Byte count supplied to the read.
        actual: usize,
    },

    /// The persisted primer cannot be parsed.
    #[error("corrupt read primer: {message}")]
    CorruptPrimer {
        /// Description of the corruption.
        message: String,
    },

    /// Persisted state contradicts itself.
    #[error("consistency error: {message}")]
    ConsistencyError {
        /// Description of the inconsistency.
        message: String,
    },
}

/// Flat discriminant of [`CoreError`], for matching and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ErrorKind {
    Storage,
    InvalidName,
    InvalidRecordSize,
    InvalidCount,
    EmptyRecord,
    InvalidConfig,
    NotRegistered,
    CorruptRegistration,
    AlreadyRegistered,
    IndexUnavailable,
    RecordTooLarge,
    SegmentOpenFailed,
    WriteFailed,
    ReadFailed,
    EvictionFailed,
    DirectoryLocked,
    NoPrimedRead,
    PrimerMismatch,
    CorruptPrimer,
    ConsistencyError,
}

impl CoreError {
    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Storage(_) => ErrorKind::Storage,
            Self::InvalidName { .. } => ErrorKind::InvalidName,
            Self::InvalidRecordSize { .. } => ErrorKind::InvalidRecordSize,
            Self::InvalidCount => ErrorKind::InvalidCount,
            Self::EmptyRecord { .. } => ErrorKind::EmptyRecord,
            Self::InvalidConfig { .. } => ErrorKind::InvalidConfig,
            Self::NotRegistered { .. } => ErrorKind::NotRegistered,
            Self::CorruptRegistration { .. } => ErrorKind::CorruptRegistration,
            Self::AlreadyRegistered { .. } => ErrorKind::AlreadyRegistered,
            Self::IndexUnavailable { .. } => ErrorKind::IndexUnavailable,
            Self::RecordTooLarge { .. } => ErrorKind::RecordTooLarge,
            Self::SegmentOpenFailed { .. } => ErrorKind::SegmentOpenFailed,
            Self::WriteFailed { .. } => ErrorKind::WriteFailed,
            Self::ReadFailed { .. } => ErrorKind::ReadFailed,
            Self::EvictionFailed { .. } => ErrorKind::EvictionFailed,
            Self::DirectoryLocked => ErrorKind::DirectoryLocked,
            Self::NoPrimedRead => ErrorKind::NoPrimedRead,
            Self::PrimerMismatch { .. } => ErrorKind::PrimerMismatch,
            Self::CorruptPrimer { .. } => ErrorKind::CorruptPrimer,
            Self::ConsistencyError { .. } => ErrorKind::ConsistencyError,
        }
    }

    /// Returns true for errors caused by caller input rather than state.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidName
                | ErrorKind::InvalidRecordSize
                | ErrorKind::InvalidCount
                | ErrorKind::EmptyRecord
                | ErrorKind::InvalidConfig
        )
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates a consistency error.
    pub fn consistency(message: impl Into<String>) -> Self {
        Self::ConsistencyError {
            message: message.into(),
        }
    }

    /// Creates a corrupt primer error.
    pub fn corrupt_primer(message: impl Into<String>) -> Self {
        Self::CorruptPrimer {
            message: message.into(),
        }
    }

    /// Creates an index unavailable error.
    pub fn index_unavailable(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::IndexUnavailable {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a corrupt registration error.
    pub fn corrupt_registration(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CorruptRegistration {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Locked => Self::DirectoryLocked,
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_storage_maps_to_directory_locked() {
        let err: CoreError = StorageError::Locked.into();
        assert_eq!(err.kind(), ErrorKind::DirectoryLocked);
    }

    #[test]
    fn other_storage_errors_wrap() {
        let err: CoreError = StorageError::not_found("a_0.log").into();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn validation_classification() {
        assert!(CoreError::InvalidCount.is_validation());
        assert!(CoreError::InvalidRecordSize { size: 0, max: 8 }.is_validation());
        assert!(!CoreError::NoPrimedRead.is_validation());
        assert!(!CoreError::consistency("x").is_validation());
    }

    #[test]
    fn messages_name_the_variable() {
        let err = CoreError::RecordTooLarge {
            name: "temp".into(),
            len: 9,
            record_size: 4,
        };
        assert_eq!(err.to_string(), "record of 9 bytes exceeds registered size 4 for temp");
    }
}
