//! Segment writer: append, rollover and eviction.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::layout;
use crate::registry::Registry;
use crate::segment::record::pad_record;
use crate::types::VariableName;
use datalog_storage::LogDirectory;
use std::sync::Arc;

/// Outcome of the eviction step of an append.
#[derive(Debug)]
pub enum Eviction {
    /// Nothing was due for deletion.
    None,
    /// Segments with these indices were deleted, oldest first.
    Evicted(Vec<u64>),
    /// Deleting an expired segment failed. The record was still written.
    Failed(CoreError),
}

impl Eviction {
    /// Returns the eviction failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<&CoreError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Result of a successful append.
#[derive(Debug)]
pub struct AppendReport {
    /// Index of the segment the record went to.
    pub segment: u64,
    /// Byte offset of the record within that segment.
    pub offset: u64,
    /// Whether the append rolled over to a new segment.
    pub rolled_over: bool,
    /// What the eviction step did.
    pub eviction: Eviction,
}

/// Appends fixed-size records to the segments of a variable.
///
/// The writer holds no per-variable state between calls: record size and
/// current index come from the [`Registry`] on every append.
pub struct SegmentWriter {
    dir: Arc<dyn LogDirectory>,
    registry: Registry,
    config: Config,
}

impl SegmentWriter {
    /// Creates a writer over `dir`.
    pub fn new(dir: Arc<dyn LogDirectory>, registry: Registry, config: Config) -> Self {
        Self {
            dir,
            registry,
            config,
        }
    }

    /// Appends one record for `name`.
    ///
    /// `data` may be shorter than the registered record size, in which case
    /// it is padded per [`Config::padding`]. The record is synced to disk
    /// before this returns.
    ///
    /// # Errors
    ///
    /// - `NotRegistered` / `CorruptRegistration` if the size can't be resolved
    /// - `EmptyRecord` if `data` is empty
    /// - `RecordTooLarge` if `data` is longer than the registered size
    /// - `IndexUnavailable` if the log index can't be read or advanced
    /// - `SegmentOpenFailed` / `WriteFailed` on segment I/O failure
    ///
    /// An eviction failure is not an error; it is carried in
    /// [`AppendReport::eviction`].
    pub fn append(&self, name: &VariableName, data: &[u8]) -> CoreResult<AppendReport> {
        let record_size = self.registry.check_registration(name)?;

        if data.is_empty() {
            return Err(CoreError::EmptyRecord {
                name: name.to_string(),
            });
        }
        if data.len() > record_size {
            return Err(CoreError::RecordTooLarge {
                name: name.to_string(),
                len: data.len(),
                record_size,
            });
        }

        let record = pad_record(data, record_size, self.config.padding);
        if data.len() < record_size {
            tracing::debug!(
                name = %name,
                len = data.len(),
                record_size,
                padding = ?self.config.padding,
                "padded short record"
            );
        }

        let mut index = self.registry.get_log_index(name)?;
        let mut file = layout::segment_file(name, index);
        let size = self.prepare_segment(&file, record_size)?;

        let mut rolled_over = false;
        if size + record_size as u64 > self.config.max_segment_size {
            self.dir.close(&file);
            index = self.roll_over(name, record_size)?;
            file = layout::segment_file(name, index);
            self.prepare_segment(&file, record_size)?;
            rolled_over = true;
        }

        let offset = self
            .dir
            .append(&file, &record)
            .map_err(|source| CoreError::WriteFailed {
                file: file.clone(),
                source,
            })?;
        self.dir
            .sync(&file)
            .map_err(|source| CoreError::WriteFailed {
                file: file.clone(),
                source,
            })?;

        let eviction = if rolled_over {
            self.sweep(name, index)
        } else {
            self.evict_one(name, index)
        };

        Ok(AppendReport {
            segment: index,
            offset,
            rolled_over,
            eviction,
        })
    }

    /// Opens `file` for append, creating it if missing, and returns its
    /// size after trimming any torn tail.
    fn prepare_segment(&self, file: &str, record_size: usize) -> CoreResult<u64> {
        let open_failed = |source| CoreError::SegmentOpenFailed {
            file: file.to_string(),
            source,
        };

        self.dir.create(file).map_err(open_failed)?;
        let size = self.dir.size(file).map_err(open_failed)?.unwrap_or(0);

        let excess = size % record_size as u64;
        if excess == 0 {
            return Ok(size);
        }

        let trimmed = size - excess;
        tracing::warn!(file, size, excess, "trimming torn record at segment tail");
        self.dir.truncate(file, trimmed).map_err(open_failed)?;
        Ok(trimmed)
    }

    /// Advances the index until it names a segment that can take one more
    /// record, or one that does not exist yet.
    ///
    /// Each step persists the index before the segment is touched, so a
    /// crash can leave the index pointing at a segment that was never
    /// created. Recovery detects that state.
    fn roll_over(&self, name: &VariableName, record_size: usize) -> CoreResult<u64> {
        loop {
            let candidate = self.registry.iterate_log_index(name)?;
            let file = layout::segment_file(name, candidate);
            let existing = self
                .dir
                .size(&file)
                .map_err(|source| CoreError::SegmentOpenFailed {
                    file: file.clone(),
                    source,
                })?;

            match existing {
                Some(size) if size + record_size as u64 > self.config.max_segment_size => {
                    tracing::debug!(name = %name, index = candidate, size, "skipping full segment");
                }
                Some(size) => {
                    tracing::debug!(name = %name, index = candidate, size, "rolled over to existing segment");
                    return Ok(candidate);
                }
                None => {
                    tracing::debug!(name = %name, index = candidate, "rolled over to new segment");
                    return Ok(candidate);
                }
            }
        }
    }

    /// Deletes every segment of `name` outside the retention window that
    /// ends at the current index.
    ///
    /// Appends only look for the one segment that just expired; this
    /// catches anything older left behind when the index moved by more
    /// than one step, as after a repair.
    ///
    /// # Errors
    ///
    /// `IndexUnavailable` if the index can't be read. Deletion failures are
    /// carried in the returned [`Eviction`].
    pub fn evict_expired(&self, name: &VariableName) -> CoreResult<Eviction> {
        let head = self.registry.get_log_index(name)?;
        Ok(self.sweep(name, head))
    }

    /// Oldest index still retained with `head` as the writable segment.
    fn retained_from(&self, head: u64) -> Option<u64> {
        let retention = self.config.retention_count();
        (head >= retention).then(|| head - retention + 1)
    }

    /// Deletes the segment that just fell out of the retention window.
    fn evict_one(&self, name: &VariableName, head: u64) -> Eviction {
        let Some(oldest) = self.retained_from(head) else {
            return Eviction::None;
        };
        let victim = oldest - 1;
        match self.remove_segment(name, victim) {
            Ok(true) => Eviction::Evicted(vec![victim]),
            Ok(false) => Eviction::None,
            Err(err) => Eviction::Failed(err),
        }
    }

    /// Deletes every segment older than the retention window.
    fn sweep(&self, name: &VariableName, head: u64) -> Eviction {
        let Some(oldest) = self.retained_from(head) else {
            return Eviction::None;
        };
        let expired = match self.registry.segment_indices(name) {
            Ok(indices) => indices.into_iter().take_while(|&i| i < oldest),
            Err(err) => {
                tracing::warn!(name = %name, error = %err, "could not list segments for eviction");
                return Eviction::Failed(err);
            }
        };

        let mut evicted = Vec::new();
        for victim in expired {
            match self.remove_segment(name, victim) {
                Ok(true) => evicted.push(victim),
                Ok(false) => {}
                Err(err) => return Eviction::Failed(err),
            }
        }

        if evicted.is_empty() {
            Eviction::None
        } else {
            Eviction::Evicted(evicted)
        }
    }

    fn remove_segment(&self, name: &VariableName, index: u64) -> CoreResult<bool> {
        let file = layout::segment_file(name, index);
        match self.dir.remove(&file) {
            Ok(removed) => {
                if removed {
                    tracing::info!(name = %name, index, "evicted segment");
                }
                Ok(removed)
            }
            Err(source) => {
                let err = CoreError::EvictionFailed {
                    name: name.to_string(),
                    index,
                    source,
                };
                tracing::warn!(error = %err, "eviction failed; record was still written");
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for SegmentWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentWriter")
            .field("max_segment_size", &self.config.max_segment_size)
            .field("retention_count", &self.config.retention_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaddingPolicy;
    use datalog_storage::{InMemoryDirectory, StorageError, StorageResult};

    /// Delegates to an in-memory directory but refuses every removal.
    struct StickyDirectory(InMemoryDirectory);

    impl LogDirectory for StickyDirectory {
        fn exists(&self, file: &str) -> StorageResult<bool> {
            self.0.exists(file)
        }
        fn size(&self, file: &str) -> StorageResult<Option<u64>> {
            self.0.size(file)
        }
        fn create(&self, file: &str) -> StorageResult<bool> {
            self.0.create(file)
        }
        fn append(&self, file: &str, data: &[u8]) -> StorageResult<u64> {
            self.0.append(file, data)
        }
        fn read_at(&self, file: &str, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
            self.0.read_at(file, offset, len)
        }
        fn sync(&self, file: &str) -> StorageResult<()> {
            self.0.sync(file)
        }
        fn truncate(&self, file: &str, new_size: u64) -> StorageResult<()> {
            self.0.truncate(file, new_size)
        }
        fn remove(&self, _file: &str) -> StorageResult<bool> {
            Err(StorageError::InvalidInput("removal refused".into()))
        }
        fn close(&self, file: &str) {
            self.0.close(file);
        }
        fn read_string(&self, file: &str) -> StorageResult<Option<String>> {
            self.0.read_string(file)
        }
        fn write_string(&self, file: &str, contents: &str) -> StorageResult<()> {
            self.0.write_string(file, contents)
        }
        fn list(&self) -> StorageResult<Vec<String>> {
            self.0.list()
        }
    }

    /// 4-byte records, 4 records per segment, 3 segments retained.
    fn small_config() -> Config {
        Config::new()
            .max_segment_size(16)
            .max_log_set_size(48)
            .max_record_size(8)
    }

    fn setup(config: Config) -> (Arc<InMemoryDirectory>, Registry, SegmentWriter, VariableName) {
        let dir = Arc::new(InMemoryDirectory::new());
        let registry = Registry::new(dir.clone());
        let name = VariableName::parse("temp", 64).unwrap();
        registry.register(&name, 4, &config).unwrap();
        let writer = SegmentWriter::new(dir.clone(), registry.clone(), config);
        (dir, registry, writer, name)
    }

    fn value(i: u32) -> [u8; 4] {
        i.to_le_bytes()
    }

    #[test]
    fn append_writes_record() {
        let (dir, _registry, writer, name) = setup(small_config());

        let report = writer.append(&name, &value(7)).unwrap();
        assert_eq!(report.segment, 0);
        assert_eq!(report.offset, 0);
        assert!(!report.rolled_over);
        assert!(matches!(report.eviction, Eviction::None));
        assert_eq!(dir.contents("temp_0.log"), Some(value(7).to_vec()));
    }

    #[test]
    fn append_rolls_over_when_full() {
        let (dir, registry, writer, name) = setup(small_config());

        for i in 0..4 {
            let report = writer.append(&name, &value(i)).unwrap();
            assert_eq!(report.segment, 0);
        }

        let report = writer.append(&name, &value(4)).unwrap();
        assert!(report.rolled_over);
        assert_eq!(report.segment, 1);
        assert_eq!(report.offset, 0);
        assert_eq!(registry.get_log_index(&name).unwrap(), 1);
        assert_eq!(dir.size("temp_0.log").unwrap(), Some(16));
        assert_eq!(dir.contents("temp_1.log"), Some(value(4).to_vec()));
    }

    #[test]
    fn rollover_skips_full_existing_segments() {
        let (dir, registry, writer, name) = setup(small_config());
        dir.put_raw("temp_0.log", vec![0; 16]);
        dir.put_raw("temp_1.log", vec![1; 16]);
        dir.put_raw("temp_2.log", vec![2; 8]);

        let report = writer.append(&name, &value(9)).unwrap();
        assert_eq!(report.segment, 2);
        assert_eq!(report.offset, 8);
        assert_eq!(registry.get_log_index(&name).unwrap(), 2);
    }

    #[test]
    fn eviction_keeps_retention_count() {
        let (dir, _registry, writer, name) = setup(small_config());

        // Segments 0..=2 fill without eviction.
        for i in 0..12 {
            let report = writer.append(&name, &value(i)).unwrap();
            assert!(matches!(report.eviction, Eviction::None));
        }

        // First record of segment 3 evicts segment 0.
        let report = writer.append(&name, &value(12)).unwrap();
        assert_eq!(report.segment, 3);
        assert!(matches!(report.eviction, Eviction::Evicted(ref v) if v == &[0]));
        assert!(dir.contents("temp_0.log").is_none());

        // Further appends to segment 3 find nothing left to evict.
        let report = writer.append(&name, &value(13)).unwrap();
        assert!(matches!(report.eviction, Eviction::None));
        assert_eq!(
            dir.list().unwrap().iter().filter(|f| f.ends_with(".log")).count(),
            3
        );
    }

    #[test]
    fn rollover_past_full_segments_sweeps_window() {
        let (dir, registry, writer, name) = setup(small_config());
        for i in 0..4 {
            dir.put_raw(&format!("temp_{i}.log"), vec![0; 16]);
        }

        // Index 0 is full and 1..=3 are full too: the rollover lands on 4
        // and everything below the window 2..=4 must go.
        let report = writer.append(&name, &value(1)).unwrap();
        assert_eq!(report.segment, 4);
        assert!(matches!(report.eviction, Eviction::Evicted(ref v) if v == &[0, 1]));
        assert_eq!(registry.segment_indices(&name).unwrap(), vec![2, 3, 4]);
    }

    #[test]
    fn evict_expired_clears_stragglers() {
        let (dir, registry, writer, name) = setup(small_config());
        for i in 1..=5 {
            dir.put_raw(&format!("temp_{i}.log"), vec![0; 4]);
        }
        registry.set_log_index(&name, 5).unwrap();

        let eviction = writer.evict_expired(&name).unwrap();
        assert!(matches!(eviction, Eviction::Evicted(ref v) if v == &[0, 1, 2]));
        assert_eq!(registry.segment_indices(&name).unwrap(), vec![3, 4, 5]);

        assert!(matches!(writer.evict_expired(&name).unwrap(), Eviction::None));
    }

    #[test]
    fn eviction_failure_is_not_fatal() {
        let dir = Arc::new(StickyDirectory(InMemoryDirectory::new()));
        let config = small_config();
        let registry = Registry::new(dir.clone());
        let name = VariableName::parse("temp", 64).unwrap();
        registry.register(&name, 4, &config).unwrap();
        let writer = SegmentWriter::new(dir.clone(), registry, config);

        for i in 0..12 {
            writer.append(&name, &value(i)).unwrap();
        }

        let report = writer.append(&name, &value(12)).unwrap();
        assert_eq!(report.segment, 3);
        assert!(matches!(
            report.eviction.error(),
            Some(CoreError::EvictionFailed { index: 0, .. })
        ));
        assert_eq!(dir.0.contents("temp_3.log"), Some(value(12).to_vec()));
    }

    #[test]
    fn short_records_are_padded() {
        let (dir, _registry, writer, name) = setup(small_config());
        writer.append(&name, &[5, 6]).unwrap();
        assert_eq!(dir.contents("temp_0.log"), Some(vec![5, 6, 6, 6]));

        let (dir, _registry, writer, name) = setup(small_config().padding(PaddingPolicy::Zero));
        writer.append(&name, &[5, 6]).unwrap();
        assert_eq!(dir.contents("temp_0.log"), Some(vec![5, 6, 0, 0]));
    }

    #[test]
    fn oversized_and_empty_records_rejected() {
        let (dir, _registry, writer, name) = setup(small_config());

        assert!(matches!(
            writer.append(&name, &[0; 5]),
            Err(CoreError::RecordTooLarge { len: 5, record_size: 4, .. })
        ));
        assert!(matches!(
            writer.append(&name, &[]),
            Err(CoreError::EmptyRecord { .. })
        ));
        assert_eq!(dir.contents("temp_0.log"), Some(Vec::new()));
    }

    #[test]
    fn append_unregistered_fails() {
        let (_dir, _registry, writer, _name) = setup(small_config());
        let ghost = VariableName::parse("ghost", 64).unwrap();
        assert!(matches!(
            writer.append(&ghost, &value(1)),
            Err(CoreError::NotRegistered { .. })
        ));
    }

    #[test]
    fn torn_tail_trimmed_before_append() {
        let (dir, _registry, writer, name) = setup(small_config());
        dir.put_raw("temp_0.log", vec![1, 1, 1, 1, 2, 2]);

        let report = writer.append(&name, &value(3)).unwrap();
        assert_eq!(report.offset, 4);
        assert_eq!(
            dir.contents("temp_0.log"),
            Some(vec![1, 1, 1, 1, 3, 0, 0, 0])
        );
    }

    #[test]
    fn missing_head_segment_is_recreated() {
        let (dir, registry, writer, name) = setup(small_config());
        registry.iterate_log_index(&name).unwrap();

        let report = writer.append(&name, &value(1)).unwrap();
        assert_eq!(report.segment, 1);
        assert_eq!(dir.contents("temp_1.log"), Some(value(1).to_vec()));
    }
}
