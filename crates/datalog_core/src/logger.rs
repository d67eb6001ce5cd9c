//! Data logger facade and open-time recovery.

use crate::config::Config;
use crate::error::{CoreError, CoreResult, ErrorKind};
use crate::layout;
use crate::primer::{PrimerSlot, ReadPrimer};
use crate::recovery::{ConsistencyReport, Recovery};
use crate::registry::{RegisterOutcome, Registry};
use crate::segment::{AppendReport, ReverseRecords, SegmentReader, SegmentWriter};
use crate::types::VariableName;
use datalog_storage::{FileDirectory, InMemoryDirectory, LogDirectory};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Result of a performed read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Variable that was read.
    pub name: String,
    /// Records requested when the read was primed.
    pub requested: usize,
    /// Records actually written into the buffer.
    pub filled: usize,
    /// Size of each record in bytes.
    pub record_size: usize,
}

impl ReadOutcome {
    /// Returns true if the log held fewer records than requested.
    #[must_use]
    pub fn is_short(&self) -> bool {
        self.filled < self.requested
    }

    /// Number of buffer bytes that hold records.
    #[must_use]
    pub fn bytes_filled(&self) -> usize {
        self.filled * self.record_size
    }
}

/// On-disk summary of one variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableStats {
    /// Variable name.
    pub name: String,
    /// Registered record size in bytes.
    pub record_size: usize,
    /// Current writable segment index.
    pub log_index: u64,
    /// Segments reachable by a backward walk from the index.
    pub segments: usize,
    /// Whole records stored across all segments.
    pub records: u64,
    /// Total segment bytes, including any torn tail.
    pub bytes_on_disk: u64,
}

/// One mutex per variable name.
#[derive(Default)]
struct NameLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl NameLocks {
    /// Runs `f` while holding the lock for `name`. The entry is dropped
    /// again if `f` finds the name unregistered.
    fn with<T>(&self, name: &VariableName, f: impl FnOnce() -> CoreResult<T>) -> CoreResult<T> {
        let lock = Arc::clone(self.locks.lock().entry(name.to_string()).or_default());
        let result = {
            let _guard = lock.lock();
            f()
        };
        drop(lock);

        if matches!(&result, Err(e) if e.kind() == ErrorKind::NotRegistered) {
            self.forget(name);
        }
        result
    }

    /// Drops the entry for `name` unless another caller holds it.
    fn forget(&self, name: &VariableName) {
        let mut locks = self.locks.lock();
        if locks
            .get(name.as_str())
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(name.as_str());
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

/// The main logger handle.
///
/// A `DataLogger` owns one logging directory. Every variable registered
/// in it gets its own chain of segments, capped by the configured segment
/// and log-set sizes; the oldest segments are evicted as new ones are
/// created.
///
/// # Opening
///
/// ```rust,ignore
/// use datalog_core::{Config, DataLogger};
/// use std::path::Path;
///
/// let logger = DataLogger::open(Path::new("logs"))?;
/// logger.register("temperature", 4)?;
/// logger.append("temperature", &21i32.to_le_bytes())?;
/// ```
///
/// For tests, [`DataLogger::in_memory`] keeps everything in memory.
///
/// # Reading
///
/// Reads are either primed and performed into a caller buffer, or taken
/// directly with [`DataLogger::read_latest`] / [`DataLogger::records`].
///
/// ```rust
/// use datalog_core::{Config, DataLogger};
///
/// let logger = DataLogger::in_memory(Config::default()).unwrap();
/// logger.register("temp", 2).unwrap();
/// logger.append("temp", &[1, 0]).unwrap();
/// logger.append("temp", &[2, 0]).unwrap();
///
/// let needed = logger.prime_read("temp", 2).unwrap();
/// let mut buffer = vec![0u8; needed];
/// let outcome = logger.perform_read(&mut buffer).unwrap();
/// assert_eq!(outcome.filled, 2);
/// assert_eq!(buffer, [2, 0, 1, 0]);
/// ```
///
/// # Thread Safety
///
/// Calls for the same variable are serialized; calls for different
/// variables run concurrently. Priming and performing a read are
/// serialized on the single primer slot.
pub struct DataLogger {
    config: Config,
    dir: Arc<dyn LogDirectory>,
    registry: Registry,
    writer: SegmentWriter,
    reader: SegmentReader,
    recovery: Recovery,
    primer: PrimerSlot,
    /// Held across prime and perform.
    primer_lock: Mutex<()>,
    name_locks: NameLocks,
}

impl DataLogger {
    /// Opens a logging directory with the default configuration.
    ///
    /// # Errors
    ///
    /// See [`Self::open_with_config`].
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a logging directory.
    ///
    /// The method:
    /// - Creates the directory if it doesn't exist (unless `create_if_missing` is false)
    /// - Acquires an exclusive lock to prevent concurrent access
    /// - Verifies every registered variable, repairing if `repair_on_open` is set
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if the configuration fails [`Config::validate`]
    /// - `DirectoryLocked` if another handle holds the directory
    /// - Storage errors from opening or repairing
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        config.validate()?;
        let dir = FileDirectory::open(path, config.create_if_missing)?;
        tracing::info!(path = %path.display(), "opened logging directory");
        Self::with_directory(Arc::new(dir), config)
    }

    /// Creates a logger whose files live only in memory.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the configuration fails [`Config::validate`].
    pub fn in_memory(config: Config) -> CoreResult<Self> {
        Self::with_directory(Arc::new(InMemoryDirectory::new()), config)
    }

    /// Creates a logger over any [`LogDirectory`].
    ///
    /// # Errors
    ///
    /// `InvalidConfig`, or a storage error from open-time recovery.
    pub fn with_directory(dir: Arc<dyn LogDirectory>, config: Config) -> CoreResult<Self> {
        config.validate()?;

        let registry = Registry::new(Arc::clone(&dir));
        let logger = Self {
            writer: SegmentWriter::new(Arc::clone(&dir), registry.clone(), config.clone()),
            reader: SegmentReader::new(Arc::clone(&dir), registry.clone()),
            recovery: Recovery::new(Arc::clone(&dir), registry.clone()),
            primer: PrimerSlot::new(Arc::clone(&dir), config.max_name_length),
            primer_lock: Mutex::new(()),
            name_locks: NameLocks::default(),
            registry,
            dir,
            config,
        };
        logger.recover()?;
        Ok(logger)
    }

    fn recover(&self) -> CoreResult<()> {
        for raw in self.registry.registered_names()? {
            let name = match VariableName::parse(&raw, self.config.max_name_length) {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!(name = %raw, error = %e, "skipping unparsable registration");
                    continue;
                }
            };

            let report = self.recovery.verify(&name)?;
            if report.is_consistent() {
                continue;
            }
            for finding in &report.findings {
                tracing::warn!(name = %name, %finding, "inconsistent state found on open");
            }
            if self.config.repair_on_open {
                self.repair_locked(&name)?;
            }
        }
        Ok(())
    }

    fn name(&self, name: &str) -> CoreResult<VariableName> {
        VariableName::parse(name, self.config.max_name_length)
    }

    /// Registers `name` with a fixed record size.
    ///
    /// # Errors
    ///
    /// See [`Registry::register`].
    pub fn register(&self, name: &str, record_size: usize) -> CoreResult<RegisterOutcome> {
        let name = self.name(name)?;
        self.name_locks.with(&name, || self.registry.register(&name, record_size, &self.config))
    }

    /// Removes `name` and all of its data. Returns the number of segments
    /// deleted.
    ///
    /// # Errors
    ///
    /// `NotRegistered` if `name` has no registration.
    pub fn unregister(&self, name: &str) -> CoreResult<usize> {
        let name = self.name(name)?;
        let removed = self.name_locks.with(&name, || self.registry.unregister(&name))?;
        self.name_locks.forget(&name);
        Ok(removed)
    }

    /// Returns the record size of `name`.
    ///
    /// # Errors
    ///
    /// `NotRegistered` or `CorruptRegistration`.
    pub fn check_registration(&self, name: &str) -> CoreResult<usize> {
        self.registry.check_registration(&self.name(name)?)
    }

    /// Appends one record to `name`.
    ///
    /// # Errors
    ///
    /// See [`SegmentWriter::append`].
    pub fn append(&self, name: &str, data: &[u8]) -> CoreResult<AppendReport> {
        let name = self.name(name)?;
        self.name_locks.with(&name, || self.writer.append(&name, data))
    }

    /// Stages a read of the `count` most recent records of `name`.
    ///
    /// Returns the exact buffer length the following
    /// [`Self::perform_read`] must be given. Replaces any pending primer.
    ///
    /// # Errors
    ///
    /// `InvalidCount` if `count` is zero, `NotRegistered` if `name` has no
    /// registration.
    pub fn prime_read(&self, name: &str, count: usize) -> CoreResult<usize> {
        let name = self.name(name)?;
        if count == 0 {
            return Err(CoreError::InvalidCount);
        }

        let _slot = self.primer_lock.lock();
        let record_size = self.registry.check_registration(&name)?;
        let required_bytes = record_size
            .checked_mul(count)
            .ok_or(CoreError::InvalidCount)?;

        self.primer.store(&ReadPrimer {
            name,
            count,
            required_bytes,
        })?;
        Ok(required_bytes)
    }

    /// Performs the pending read into `buffer`, newest record first.
    ///
    /// The primer is consumed whether or not the read succeeds. A short
    /// read is not an error; buffer bytes past the filled records keep
    /// their previous contents.
    ///
    /// # Errors
    ///
    /// - `NoPrimedRead` if nothing is pending; `buffer` is untouched
    /// - `PrimerMismatch` if `buffer.len()` differs from the primed length
    /// - `ConsistencyError` if the record size changed since priming
    /// - `CorruptPrimer` if the primer file is unreadable
    pub fn perform_read(&self, buffer: &mut [u8]) -> CoreResult<ReadOutcome> {
        let _slot = self.primer_lock.lock();
        let primer = self.primer.take()?.ok_or(CoreError::NoPrimedRead)?;

        if buffer.len() != primer.required_bytes {
            return Err(CoreError::PrimerMismatch {
                expected: primer.required_bytes,
                actual: buffer.len(),
            });
        }

        self.name_locks.with(&primer.name, || self.read_primed(&primer, buffer))
    }

    fn read_primed(&self, primer: &ReadPrimer, buffer: &mut [u8]) -> CoreResult<ReadOutcome> {
        let record_size = self.registry.check_registration(&primer.name)?;
        if record_size.checked_mul(primer.count) != Some(primer.required_bytes) {
            return Err(CoreError::consistency(format!(
                "{} records of {record_size} bytes do not fill the primed {} bytes of '{}'",
                primer.count, primer.required_bytes, primer.name
            )));
        }

        let filled = self.reader.fill(&primer.name, record_size, buffer)?;
        let outcome = ReadOutcome {
            name: primer.name.to_string(),
            requested: primer.count,
            filled,
            record_size,
        };
        if outcome.is_short() {
            tracing::debug!(
                name = %primer.name,
                requested = outcome.requested,
                filled,
                "short read"
            );
        }
        Ok(outcome)
    }

    /// Returns the pending primer, if any, without consuming it.
    ///
    /// # Errors
    ///
    /// `CorruptPrimer` if the primer file is unreadable.
    pub fn pending_primer(&self) -> CoreResult<Option<ReadPrimer>> {
        let _slot = self.primer_lock.lock();
        self.primer.peek()
    }

    /// Returns up to `count` of the most recent records of `name`.
    ///
    /// # Errors
    ///
    /// See [`SegmentReader::read_latest`].
    pub fn read_latest(&self, name: &str, count: usize) -> CoreResult<Vec<Vec<u8>>> {
        let name = self.name(name)?;
        self.name_locks.with(&name, || self.reader.read_latest(&name, count))
    }

    /// Returns a lazy most-recent-first iterator over `name`.
    ///
    /// The iterator does not hold the variable's lock; appends made while
    /// it is alive are not observed, and evictions may end it early.
    ///
    /// # Errors
    ///
    /// See [`SegmentReader::records`].
    pub fn records(&self, name: &str) -> CoreResult<ReverseRecords> {
        let name = self.name(name)?;
        self.name_locks.with(&name, || self.reader.records(&name))
    }

    /// Returns the current writable segment index of `name`.
    ///
    /// # Errors
    ///
    /// `IndexUnavailable` if the index is missing or unreadable.
    pub fn get_log_index(&self, name: &str) -> CoreResult<u64> {
        self.registry.get_log_index(&self.name(name)?)
    }

    /// Counts the contiguous segments of `name` ending at the current
    /// index.
    ///
    /// # Errors
    ///
    /// See [`SegmentReader::count_logs`].
    pub fn count_logs(&self, name: &str) -> CoreResult<usize> {
        let name = self.name(name)?;
        self.name_locks.with(&name, || self.reader.count_logs(&name))
    }

    /// Checks `name` for inconsistencies without changing anything.
    ///
    /// # Errors
    ///
    /// See [`Recovery::verify`].
    pub fn verify(&self, name: &str) -> CoreResult<ConsistencyReport> {
        let name = self.name(name)?;
        self.name_locks.with(&name, || self.recovery.verify(&name))
    }

    /// Repairs every fixable inconsistency of `name`, then evicts any
    /// segment left outside the retention window.
    ///
    /// # Errors
    ///
    /// See [`Recovery::repair`].
    pub fn repair(&self, name: &str) -> CoreResult<ConsistencyReport> {
        let name = self.name(name)?;
        self.name_locks.with(&name, || self.repair_locked(&name))
    }

    fn repair_locked(&self, name: &VariableName) -> CoreResult<ConsistencyReport> {
        let report = self.recovery.repair(name)?;
        if let Some(err) = self.writer.evict_expired(name)?.error() {
            tracing::warn!(name = %name, error = %err, "expired segments remain after repair");
        }
        Ok(report)
    }

    /// Lists registered variables in name order.
    ///
    /// # Errors
    ///
    /// Storage errors from listing the directory.
    pub fn registered_names(&self) -> CoreResult<Vec<String>> {
        self.registry.registered_names()
    }

    /// Summarizes the on-disk state of `name`.
    ///
    /// # Errors
    ///
    /// Fails if the registration or the log index can't be resolved.
    pub fn stats(&self, name: &str) -> CoreResult<VariableStats> {
        let name = self.name(name)?;
        self.name_locks.with(&name, || self.stats_locked(&name))
    }

    fn stats_locked(&self, name: &VariableName) -> CoreResult<VariableStats> {
        let record_size = self.registry.check_registration(name)?;
        let log_index = self.registry.get_log_index(name)?;
        let segments = self.reader.count_logs(name)?;

        let mut records = 0;
        let mut bytes_on_disk = 0;
        for index in self.registry.segment_indices(name)? {
            let size = self
                .dir
                .size(&layout::segment_file(name, index))?
                .unwrap_or(0);
            records += size / record_size as u64;
            bytes_on_disk += size;
        }

        Ok(VariableStats {
            name: name.to_string(),
            record_size,
            log_index,
            segments,
            records,
            bytes_on_disk,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl std::fmt::Debug for DataLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataLogger")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
