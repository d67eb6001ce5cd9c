//! In-memory directory for testing.

use crate::directory::{validate_file_name, LogDirectory};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory namespace directory.
///
/// This directory keeps every file in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral namespaces that don't need persistence
///
/// # Thread Safety
///
/// This directory is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use datalog_storage::{InMemoryDirectory, LogDirectory};
///
/// let dir = InMemoryDirectory::new();
/// dir.write_string("temp.reg", "4").unwrap();
/// assert_eq!(dir.read_string("temp.reg").unwrap().as_deref(), Some("4"));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryDirectory {
    /// Creates a new empty in-memory directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the contents of `file`, if it exists.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn contents(&self, file: &str) -> Option<Vec<u8>> {
        self.files.read().get(file).cloned()
    }

    /// Replaces the raw contents of `file`, creating it if needed.
    ///
    /// Useful for simulating torn writes and other crash states.
    pub fn put_raw(&self, file: &str, data: Vec<u8>) {
        self.files.write().insert(file.to_string(), data);
    }

    /// Returns the number of files held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Returns true if no files are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

impl LogDirectory for InMemoryDirectory {
    fn exists(&self, file: &str) -> StorageResult<bool> {
        validate_file_name(file)?;
        Ok(self.files.read().contains_key(file))
    }

    fn size(&self, file: &str) -> StorageResult<Option<u64>> {
        validate_file_name(file)?;
        Ok(self.files.read().get(file).map(|d| d.len() as u64))
    }

    fn create(&self, file: &str) -> StorageResult<bool> {
        validate_file_name(file)?;
        let mut files = self.files.write();
        if files.contains_key(file) {
            return Ok(false);
        }
        files.insert(file.to_string(), Vec::new());
        Ok(true)
    }

    fn append(&self, file: &str, data: &[u8]) -> StorageResult<u64> {
        validate_file_name(file)?;
        let mut files = self.files.write();
        let contents = files
            .get_mut(file)
            .ok_or_else(|| StorageError::not_found(file))?;
        let offset = contents.len() as u64;
        contents.extend_from_slice(data);
        Ok(offset)
    }

    fn read_at(&self, file: &str, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        validate_file_name(file)?;
        let files = self.files.read();
        let data = files.get(file).ok_or_else(|| StorageError::not_found(file))?;
        let size = data.len() as u64;
        let end = offset.saturating_add(len as u64);

        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd {
                file: file.to_string(),
                offset,
                len,
                size,
            });
        }

        let start = offset as usize;
        Ok(data[start..start + len].to_vec())
    }

    fn sync(&self, file: &str) -> StorageResult<()> {
        // Nothing is pending in memory; only existence is checked.
        if !self.exists(file)? {
            return Err(StorageError::not_found(file));
        }
        Ok(())
    }

    fn truncate(&self, file: &str, new_size: u64) -> StorageResult<()> {
        validate_file_name(file)?;
        let mut files = self.files.write();
        let data = files
            .get_mut(file)
            .ok_or_else(|| StorageError::not_found(file))?;
        let current = data.len() as u64;

        if new_size > current {
            return Err(StorageError::InvalidInput(format!(
                "cannot truncate {file} to size {new_size} which is greater than current size {current}"
            )));
        }

        data.truncate(new_size as usize);
        Ok(())
    }

    fn remove(&self, file: &str) -> StorageResult<bool> {
        validate_file_name(file)?;
        Ok(self.files.write().remove(file).is_some())
    }

    fn close(&self, _file: &str) {}

    fn read_string(&self, file: &str) -> StorageResult<Option<String>> {
        validate_file_name(file)?;
        let Some(data) = self.contents(file) else {
            return Ok(None);
        };
        String::from_utf8(data)
            .map(Some)
            .map_err(|e| StorageError::InvalidInput(format!("{file} is not UTF-8: {e}")))
    }

    fn write_string(&self, file: &str, contents: &str) -> StorageResult<()> {
        validate_file_name(file)?;
        self.put_raw(file, contents.as_bytes().to_vec());
        Ok(())
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        Ok(self.files.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_empty() {
        let dir = InMemoryDirectory::new();
        assert!(dir.is_empty());
        assert!(dir.list().unwrap().is_empty());
    }

    #[test]
    fn memory_create_is_idempotent() {
        let dir = InMemoryDirectory::new();
        assert!(dir.create("a_0.log").unwrap());
        dir.append("a_0.log", b"xy").unwrap();

        assert!(!dir.create("a_0.log").unwrap());
        assert_eq!(dir.size("a_0.log").unwrap(), Some(2));
    }

    #[test]
    fn memory_append_returns_correct_offset() {
        let dir = InMemoryDirectory::new();
        dir.create("a_0.log").unwrap();

        assert_eq!(dir.append("a_0.log", b"hello").unwrap(), 0);
        assert_eq!(dir.append("a_0.log", b" world").unwrap(), 5);
        assert_eq!(dir.size("a_0.log").unwrap(), Some(11));
    }

    #[test]
    fn memory_append_to_missing_file_fails() {
        let dir = InMemoryDirectory::new();
        let result = dir.append("missing.log", b"x");
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn memory_read_at_returns_correct_data() {
        let dir = InMemoryDirectory::new();
        dir.create("a_0.log").unwrap();
        dir.append("a_0.log", b"hello world").unwrap();

        assert_eq!(dir.read_at("a_0.log", 0, 5).unwrap(), b"hello");
        assert_eq!(dir.read_at("a_0.log", 6, 5).unwrap(), b"world");
        assert!(dir.read_at("a_0.log", 2, 0).unwrap().is_empty());
    }

    #[test]
    fn memory_read_past_end_fails() {
        let dir = InMemoryDirectory::new();
        dir.create("a_0.log").unwrap();
        dir.append("a_0.log", b"hello").unwrap();

        assert!(matches!(
            dir.read_at("a_0.log", 3, 10),
            Err(StorageError::ReadPastEnd { .. })
        ));
        assert!(matches!(
            dir.read_at("a_0.log", 10, 1),
            Err(StorageError::ReadPastEnd { .. })
        ));
    }

    #[test]
    fn memory_size_of_missing_file_is_none() {
        let dir = InMemoryDirectory::new();
        assert_eq!(dir.size("nope.log").unwrap(), None);
        assert!(!dir.exists("nope.log").unwrap());
    }

    #[test]
    fn memory_remove_reports_presence() {
        let dir = InMemoryDirectory::new();
        dir.create("a_0.log").unwrap();

        assert!(dir.remove("a_0.log").unwrap());
        assert!(!dir.remove("a_0.log").unwrap());
    }

    #[test]
    fn memory_truncate() {
        let dir = InMemoryDirectory::new();
        dir.create("a_0.log").unwrap();
        dir.append("a_0.log", b"hello world").unwrap();

        dir.truncate("a_0.log", 5).unwrap();
        assert_eq!(dir.contents("a_0.log").unwrap(), b"hello");
        assert!(dir.truncate("a_0.log", 100).is_err());
    }

    #[test]
    fn memory_string_round_trip() {
        let dir = InMemoryDirectory::new();
        assert_eq!(dir.read_string("a.idx").unwrap(), None);

        dir.write_string("a.idx", "0").unwrap();
        dir.write_string("a.idx", "7").unwrap();
        assert_eq!(dir.read_string("a.idx").unwrap().as_deref(), Some("7"));
    }

    #[test]
    fn memory_list_is_sorted() {
        let dir = InMemoryDirectory::new();
        dir.create("b_0.log").unwrap();
        dir.write_string("a.reg", "4").unwrap();

        assert_eq!(dir.list().unwrap(), vec!["a.reg", "b_0.log"]);
    }

    #[test]
    fn memory_rejects_path_names() {
        let dir = InMemoryDirectory::new();
        assert!(matches!(
            dir.create("../escape.log"),
            Err(StorageError::InvalidFileName(_))
        ));
    }
}
