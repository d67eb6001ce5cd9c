//! File naming within a logging directory.
//!
//! ```text
//! <dir>/
//! ├─ <name>.reg          # Registered record size (text integer)
//! ├─ <name>.idx          # Current writable segment index (text integer)
//! ├─ <name>_<index>.log  # Segment: fixed-size records back-to-back
//! └─ read_primer.tmp     # The single pending primed read
//! ```

use crate::types::VariableName;

/// Extension of registration files.
pub const REGISTRATION_EXT: &str = ".reg";
/// Extension of log index files.
pub const INDEX_EXT: &str = ".idx";
/// Extension of segment files.
pub const SEGMENT_EXT: &str = ".log";
/// File holding the pending primed read.
pub const PRIMER_FILE: &str = "read_primer.tmp";

/// Returns the registration file name of `name`.
#[must_use]
pub fn registration_file(name: &VariableName) -> String {
    format!("{name}{REGISTRATION_EXT}")
}

/// Returns the log index file name of `name`.
#[must_use]
pub fn index_file(name: &VariableName) -> String {
    format!("{name}{INDEX_EXT}")
}

/// Returns the segment file name for `(name, index)`.
#[must_use]
pub fn segment_file(name: &VariableName, index: u64) -> String {
    format!("{name}_{index}{SEGMENT_EXT}")
}

/// Extracts the variable name from a registration file name.
#[must_use]
pub fn registered_name(file: &str) -> Option<&str> {
    file.strip_suffix(REGISTRATION_EXT).filter(|n| !n.is_empty())
}

/// Extracts the segment index if `file` is a segment of `name`.
///
/// The index part must be all digits, so a segment of `a` is never
/// confused with one of `a_1`.
#[must_use]
pub fn segment_index(name: &VariableName, file: &str) -> Option<u64> {
    let digits = file
        .strip_prefix(name.as_str())?
        .strip_prefix('_')?
        .strip_suffix(SEGMENT_EXT)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
