//! Core type definitions.

use crate::error::{CoreError, CoreResult};
use std::fmt;

/// A validated variable name.
///
/// Names become part of file names, so they are limited to ASCII
/// alphanumerics, `_` and `-`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableName(String);

impl VariableName {
    /// Validates `name` against the character set and `max_len`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` if the name is empty, too long, or contains a
    /// character outside `[A-Za-z0-9_-]`.
    pub fn parse(name: &str, max_len: usize) -> CoreResult<Self> {
        let reason = if name.is_empty() {
            Some("name is empty")
        } else if name.len() > max_len {
            Some("name is too long")
        } else if !name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            Some("only ASCII letters, digits, '_' and '-' are allowed")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(CoreError::InvalidName {
                name: name.to_string(),
                reason,
            }),
            None => Ok(Self(name.to_string())),
        }
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VariableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VariableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_identifier_names() {
        for name in ["temp", "testmod_testvar", "imu-0", "A1"] {
            assert_eq!(VariableName::parse(name, 64).unwrap().as_str(), name);
        }
    }

    #[test]
    fn rejects_bad_names() {
        for name in ["", "a b", "a/b", "a.b", "..", "caf\u{e9}"] {
            assert!(
                matches!(VariableName::parse(name, 64), Err(CoreError::InvalidName { .. })),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn enforces_max_length() {
        assert!(VariableName::parse("abcd", 4).is_ok());
        assert!(VariableName::parse("abcde", 4).is_err());
    }

    #[test]
    fn display_is_raw_name() {
        let name = VariableName::parse("temp", 8).unwrap();
        assert_eq!(name.to_string(), "temp");
    }
}
