//! File-system directory for persistent storage.
//!
//! ```text
//! <path>/
//! ├─ LOCK              # Advisory lock for single-writer
//! └─ ...               # Files owned by the engine
//! ```

use crate::directory::{validate_file_name, LogDirectory};
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Name of the advisory lock file.
const LOCK_FILE: &str = "LOCK";

/// Suffix of the staging file used by atomic string writes.
const STAGING_SUFFIX: &str = ".stage";

/// A namespace directory backed by an OS directory.
///
/// # Durability
///
/// - `sync()` calls `File::sync_all()` on the file
/// - `create()`, `remove()` and `write_string()` also fsync the directory
///   so the entry change survives a crash
///
/// # Thread Safety
///
/// The directory holds an exclusive advisory lock on `LOCK` for its whole
/// lifetime, so only one `FileDirectory` per path can exist at a time,
/// across processes. Within a process it can be shared across threads;
/// cached file handles sit behind a mutex.
///
/// # Example
///
/// ```no_run
/// use datalog_storage::{FileDirectory, LogDirectory};
/// use std::path::Path;
///
/// let dir = FileDirectory::open(Path::new("logs"), true).unwrap();
/// dir.create("temp_0.log").unwrap();
/// dir.append("temp_0.log", b"abcd").unwrap();
/// dir.sync("temp_0.log").unwrap();
/// ```
#[derive(Debug)]
pub struct FileDirectory {
    /// Root directory path.
    path: PathBuf,
    /// Lock file handle (held for exclusive access).
    _lock_file: File,
    /// Open handles, keyed by file name.
    handles: Mutex<HashMap<String, File>>,
}

impl FileDirectory {
    /// Opens or creates a directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the namespace directory
    /// * `create_if_missing` - If true, creates the directory if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - The path is not a directory
    /// - Another process holds the lock (returns `Locked`)
    /// - I/O errors occur
    pub fn open(path: &Path, create_if_missing: bool) -> StorageResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(StorageError::not_found(path.display().to_string()));
            }
        }

        if !path.is_dir() {
            return Err(StorageError::InvalidInput(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked);
        }

        tracing::debug!(path = %path.display(), "opened log directory");

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
            handles: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the path to the directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_path(&self, file: &str) -> StorageResult<PathBuf> {
        validate_file_name(file)?;
        Ok(self.path.join(file))
    }

    /// Runs `f` with a read/write handle for an existing `file`, opening and
    /// caching it on first use.
    fn with_handle<T>(
        &self,
        file: &str,
        f: impl FnOnce(&mut File) -> io::Result<T>,
    ) -> StorageResult<T> {
        let path = self.file_path(file)?;
        let mut handles = self.handles.lock();

        if !handles.contains_key(file) {
            let opened = OpenOptions::new()
                .read(true)
                .write(true)
                .open(&path)
                .map_err(|e| {
                    if e.kind() == io::ErrorKind::NotFound {
                        StorageError::not_found(file)
                    } else {
                        StorageError::Io(e)
                    }
                })?;
            handles.insert(file.to_string(), opened);
        }

        let handle = handles
            .get_mut(file)
            .ok_or_else(|| StorageError::not_found(file))?;
        Ok(f(handle)?)
    }

    /// Syncs the directory so entry creation, rename and deletion are
    /// durable.
    #[cfg(unix)]
    fn sync_directory(&self) -> StorageResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StorageResult<()> {
        // NTFS journals metadata; directories cannot be fsynced on Windows.
        Ok(())
    }
}

impl LogDirectory for FileDirectory {
    fn exists(&self, file: &str) -> StorageResult<bool> {
        Ok(self.file_path(file)?.is_file())
    }

    fn size(&self, file: &str) -> StorageResult<Option<u64>> {
        match fs::metadata(self.file_path(file)?) {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn create(&self, file: &str) -> StorageResult<bool> {
        let path = self.file_path(file)?;
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(created) => {
                created.sync_all()?;
                self.sync_directory()?;
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn append(&self, file: &str, data: &[u8]) -> StorageResult<u64> {
        self.with_handle(file, |handle| {
            let offset = handle.seek(SeekFrom::End(0))?;
            handle.write_all(data)?;
            Ok(offset)
        })
    }

    fn read_at(&self, file: &str, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let size = self.size(file)?.ok_or_else(|| StorageError::not_found(file))?;
        let end = offset.saturating_add(len as u64);

        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd {
                file: file.to_string(),
                offset,
                len,
                size,
            });
        }

        if len == 0 {
            return Ok(Vec::new());
        }

        self.with_handle(file, |handle| {
            handle.seek(SeekFrom::Start(offset))?;
            let mut buffer = vec![0u8; len];
            handle.read_exact(&mut buffer)?;
            Ok(buffer)
        })
    }

    fn sync(&self, file: &str) -> StorageResult<()> {
        self.with_handle(file, |handle| {
            handle.flush()?;
            handle.sync_all()
        })
    }

    fn truncate(&self, file: &str, new_size: u64) -> StorageResult<()> {
        let size = self.size(file)?.ok_or_else(|| StorageError::not_found(file))?;
        if new_size > size {
            return Err(StorageError::InvalidInput(format!(
                "cannot truncate {file} to size {new_size} which is greater than current size {size}"
            )));
        }

        self.with_handle(file, |handle| {
            handle.set_len(new_size)?;
            handle.sync_all()
        })
    }

    fn remove(&self, file: &str) -> StorageResult<bool> {
        let path = self.file_path(file)?;
        self.close(file);

        match fs::remove_file(&path) {
            Ok(()) => {
                self.sync_directory()?;
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&self, file: &str) {
        self.handles.lock().remove(file);
    }

    fn read_string(&self, file: &str) -> StorageResult<Option<String>> {
        let path = self.file_path(file)?;
        let mut contents = String::new();
        match File::open(&path) {
            Ok(mut f) => {
                f.read_to_string(&mut contents)?;
                Ok(Some(contents))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Uses write-then-rename for crash safety:
    /// 1. Write to a staging file
    /// 2. Sync the staging file to disk
    /// 3. Rename it over the target
    /// 4. Fsync the directory so the rename is durable
    fn write_string(&self, file: &str, contents: &str) -> StorageResult<()> {
        let target = self.file_path(file)?;
        let staging = self.file_path(&format!("{file}{STAGING_SUFFIX}"))?;

        let mut staged = File::create(&staging)?;
        staged.write_all(contents.as_bytes())?;
        staged.sync_all()?;
        drop(staged);

        self.close(file);
        fs::rename(&staging, &target)?;
        self.sync_directory()?;

        Ok(())
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name != LOCK_FILE && !name.ends_with(STAGING_SUFFIX) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
