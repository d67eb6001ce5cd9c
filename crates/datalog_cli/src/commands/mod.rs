//! CLI command implementations.

pub mod inspect;
pub mod read;
pub mod register;
pub mod selftest;
pub mod verify;
pub mod write;

use datalog_core::ErrorKind;

/// Errors raised while interpreting command arguments.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// A `--hex` value was not valid hex.
    #[error("invalid hex record {value:?}: {reason}")]
    InvalidHex {
        /// The offending argument.
        value: String,
        /// What was wrong with it.
        reason: &'static str,
    },
    /// A value was not a 32-bit integer.
    #[error("invalid integer {0:?}")]
    InvalidInteger(String),
    /// Output format not recognised.
    #[error("unknown format {0:?} (expected text or json)")]
    UnknownFormat(String),
}

/// Output formats shared by the reporting commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

impl Format {
    pub fn parse(format: &str) -> Result<Self, CliError> {
        match format {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(CliError::UnknownFormat(other.to_string())),
        }
    }
}

/// Process exit code for a failed core operation.
pub fn exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::InvalidName
        | ErrorKind::InvalidRecordSize
        | ErrorKind::InvalidCount
        | ErrorKind::EmptyRecord
        | ErrorKind::InvalidConfig
        | ErrorKind::RecordTooLarge => 2,
        ErrorKind::NotRegistered
        | ErrorKind::AlreadyRegistered
        | ErrorKind::CorruptRegistration => 3,
        ErrorKind::DirectoryLocked => 4,
        ErrorKind::NoPrimedRead
        | ErrorKind::PrimerMismatch
        | ErrorKind::CorruptPrimer
        | ErrorKind::ConsistencyError => 5,
        ErrorKind::Storage
        | ErrorKind::IndexUnavailable
        | ErrorKind::SegmentOpenFailed
        | ErrorKind::WriteFailed
        | ErrorKind::ReadFailed
        | ErrorKind::EvictionFailed => 1,
    }
}

pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn hex_decode(value: &str) -> Result<Vec<u8>, CliError> {
    let invalid = |reason| CliError::InvalidHex {
        value: value.to_string(),
        reason,
    };

    let digits = value.strip_prefix("0x").unwrap_or(value);
    if digits.is_empty() {
        return Err(invalid("empty"));
    }
    if digits.len() % 2 != 0 {
        return Err(invalid("odd number of digits"));
    }
    if !digits.is_ascii() {
        return Err(invalid("non-hex character"));
    }

    (0..digits.len() / 2)
        .map(|i| u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16))
        .collect::<Result<_, _>>()
        .map_err(|_| invalid("non-hex character"))
}
