//! Namespace directory trait definition.

use crate::error::{StorageError, StorageResult};

/// A flat, name-addressed byte store for one logging namespace.
///
/// Directories are **opaque**. They provide create, append, read and remove
/// operations on plain file names. The datalog engine owns all naming and
/// content interpretation - directories do not understand registrations,
/// indices or segments.
///
/// # Invariants
///
/// - `append` writes after the current end and returns that offset
/// - `read_at` returns exactly the bytes previously written at that offset
/// - `sync` makes all appended data of a file durable
/// - `write_string` replaces a file atomically: readers see the old or the
///   new contents, never a mix
/// - `create`, `remove` and `write_string` are durable when they return
///
/// # Implementors
///
/// - [`super::InMemoryDirectory`] - For testing
/// - [`super::FileDirectory`] - For persistent storage
pub trait LogDirectory: Send + Sync {
    /// Returns true if `file` exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or existence cannot be
    /// determined.
    fn exists(&self, file: &str) -> StorageResult<bool>;

    /// Returns the size of `file` in bytes, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or an I/O error occurs.
    fn size(&self, file: &str) -> StorageResult<Option<u64>>;

    /// Creates an empty `file` if it does not exist.
    ///
    /// Returns `true` if the file was created, `false` if it already existed
    /// (in which case its contents are left untouched).
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or an I/O error occurs.
    fn create(&self, file: &str) -> StorageResult<bool>;

    /// Appends `data` to the end of an existing `file`.
    ///
    /// Returns the offset where the data was written.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the file does not exist, or an
    /// I/O error.
    fn append(&self, file: &str, data: &[u8]) -> StorageResult<u64>;

    /// Reads `len` bytes of `file` starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file does not exist
    /// - The read would extend beyond the end of the file
    /// - An I/O error occurs
    fn read_at(&self, file: &str, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Syncs the data and metadata of `file` to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or the sync fails.
    fn sync(&self, file: &str) -> StorageResult<()>;

    /// Truncates `file` to `new_size` bytes and syncs it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file does not exist
    /// - `new_size` is greater than the current size
    /// - The truncation fails
    fn truncate(&self, file: &str, new_size: u64) -> StorageResult<()>;

    /// Removes `file`.
    ///
    /// Returns `true` if a file was removed, `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or the removal fails.
    fn remove(&self, file: &str) -> StorageResult<bool>;

    /// Releases any handle cached for `file`.
    ///
    /// Subsequent operations reopen the file as needed.
    fn close(&self, file: &str);

    /// Reads the whole of `file` as UTF-8 text, or `None` if it does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the contents are not UTF-8 or an I/O error occurs.
    fn read_string(&self, file: &str) -> StorageResult<Option<String>>;

    /// Atomically replaces the contents of `file` with `contents`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or an I/O error occurs.
    fn write_string(&self, file: &str, contents: &str) -> StorageResult<()>;

    /// Lists the names of all files in the directory, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    fn list(&self) -> StorageResult<Vec<String>>;
}

/// Checks that `file` is a plain name inside the directory.
///
/// Rejects empty names, `.`/`..`, path separators and NUL bytes.
///
/// # Errors
///
/// Returns [`StorageError::InvalidFileName`] when the name is rejected.
pub fn validate_file_name(file: &str) -> StorageResult<()> {
    let bad = file.is_empty()
        || file == "."
        || file == ".."
        || file.contains(['/', '\\', '\0']);
    if bad {
        return Err(StorageError::InvalidFileName(file.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_accepted() {
        assert!(validate_file_name("temp.reg").is_ok());
        assert!(validate_file_name("temp_12.log").is_ok());
        assert!(validate_file_name("read_primer.tmp").is_ok());
    }

    #[test]
    fn path_like_names_rejected() {
        for name in ["", ".", "..", "a/b", "a\\b", "nul\0"] {
            assert!(
                matches!(validate_file_name(name), Err(StorageError::InvalidFileName(_))),
                "{name:?} should be rejected"
            );
        }
    }
}
