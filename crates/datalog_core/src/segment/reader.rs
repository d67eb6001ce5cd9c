//! Segment reader: backward walk over the most recent records.

use crate::error::{CoreError, CoreResult};
use crate::layout;
use crate::registry::Registry;
use crate::types::VariableName;
use datalog_storage::LogDirectory;
use std::iter::FusedIterator;
use std::sync::Arc;

/// Position of a [`ReverseRecords`] iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// The segment at this index has not been sized yet.
    Load(u64),
    /// `remaining` records of the segment at `index` are still unread.
    Reading { index: u64, remaining: u64 },
    /// No older data.
    Done,
}

impl Cursor {
    /// Moves to the next older segment, stopping below index 0.
    fn step_back(index: u64) -> Self {
        index.checked_sub(1).map_or(Self::Done, Self::Load)
    }
}

/// A lazy iterator over the records of one variable, most recent first.
///
/// The iterator starts at the tail of the segment at the head index
/// captured when it was created and walks backward, crossing into older
/// segments as each one is exhausted. It ends when the index would fall
/// below zero or when an older segment is missing (evicted). A missing
/// head segment counts as empty, since an interrupted rollover can leave
/// the index one ahead of the files.
///
/// Each item is exactly `record_size` bytes. Trailing bytes of a segment
/// that do not form a whole record are skipped.
///
/// # Example
///
/// ```rust
/// use datalog_core::{Config, DataLogger};
///
/// let logger = DataLogger::in_memory(Config::default()).unwrap();
/// logger.register("temp", 1).unwrap();
/// for v in [1u8, 2, 3] {
///     logger.append("temp", &[v]).unwrap();
/// }
///
/// let newest: Vec<Vec<u8>> = logger
///     .records("temp")
///     .unwrap()
///     .take(2)
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(newest, vec![vec![3], vec![2]]);
/// ```
pub struct ReverseRecords {
    dir: Arc<dyn LogDirectory>,
    name: VariableName,
    record_size: usize,
    head: u64,
    cursor: Cursor,
}

impl ReverseRecords {
    pub(crate) fn new(
        dir: Arc<dyn LogDirectory>,
        name: VariableName,
        record_size: usize,
        head: u64,
    ) -> Self {
        Self {
            dir,
            name,
            record_size,
            head,
            cursor: Cursor::Load(head),
        }
    }

    /// Restarts the walk from the newest record of the captured head.
    pub fn rewind(&mut self) {
        self.cursor = Cursor::Load(self.head);
    }

    /// The head index this iterator started from.
    #[must_use]
    pub fn head(&self) -> u64 {
        self.head
    }

    fn fail(&mut self, file: String, source: datalog_storage::StorageError) -> CoreError {
        self.cursor = Cursor::Done;
        CoreError::ReadFailed { file, source }
    }
}

impl Iterator for ReverseRecords {
    type Item = CoreResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let record_size = self.record_size as u64;

        loop {
            match self.cursor {
                Cursor::Done => return None,
                Cursor::Load(index) => {
                    let file = layout::segment_file(&self.name, index);
                    match self.dir.size(&file) {
                        Err(source) => return Some(Err(self.fail(file, source))),
                        Ok(None) if index == self.head => {
                            self.cursor = Cursor::step_back(index);
                        }
                        Ok(None) => {
                            tracing::debug!(name = %self.name, index, "reached oldest retained segment");
                            self.cursor = Cursor::Done;
                        }
                        Ok(Some(size)) => {
                            if size % record_size != 0 {
                                tracing::debug!(
                                    name = %self.name,
                                    index,
                                    excess = size % record_size,
                                    "ignoring partial record at segment tail"
                                );
                            }
                            self.cursor = Cursor::Reading {
                                index,
                                remaining: size / record_size,
                            };
                        }
                    }
                }
                Cursor::Reading {
                    index,
                    remaining: 0,
                } => {
                    self.cursor = Cursor::step_back(index);
                }
                Cursor::Reading { index, remaining } => {
                    let file = layout::segment_file(&self.name, index);
                    let offset = (remaining - 1) * record_size;
                    return match self.dir.read_at(&file, offset, self.record_size) {
                        Ok(record) => {
                            self.cursor = Cursor::Reading {
                                index,
                                remaining: remaining - 1,
                            };
                            Some(Ok(record))
                        }
                        Err(source) if source.is_not_found() => {
                            tracing::debug!(name = %self.name, index, "segment evicted during walk");
                            self.cursor = Cursor::Done;
                            None
                        }
                        Err(source) => Some(Err(self.fail(file, source))),
                    };
                }
            }
        }
    }
}

impl FusedIterator for ReverseRecords {}

impl std::fmt::Debug for ReverseRecords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReverseRecords")
            .field("name", &self.name)
            .field("record_size", &self.record_size)
            .field("head", &self.head)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

/// Reads records back out of the segments of a variable.
#[derive(Clone)]
pub struct SegmentReader {
    dir: Arc<dyn LogDirectory>,
    registry: Registry,
}

impl SegmentReader {
    /// Creates a reader over `dir`.
    pub fn new(dir: Arc<dyn LogDirectory>, registry: Registry) -> Self {
        Self { dir, registry }
    }

    /// Returns a most-recent-first iterator over the records of `name`.
    ///
    /// # Errors
    ///
    /// Fails if the registration or the log index can't be resolved.
    pub fn records(&self, name: &VariableName) -> CoreResult<ReverseRecords> {
        let record_size = self.registry.check_registration(name)?;
        self.records_sized(name, record_size)
    }

    fn records_sized(&self, name: &VariableName, record_size: usize) -> CoreResult<ReverseRecords> {
        let head = self.registry.get_log_index(name)?;
        Ok(ReverseRecords::new(
            Arc::clone(&self.dir),
            name.clone(),
            record_size,
            head,
        ))
    }

    /// Returns up to `count` of the most recent records of `name`, newest
    /// first.
    ///
    /// # Errors
    ///
    /// `InvalidCount` if `count` is zero, otherwise as [`Self::records`].
    pub fn read_latest(&self, name: &VariableName, count: usize) -> CoreResult<Vec<Vec<u8>>> {
        if count == 0 {
            return Err(CoreError::InvalidCount);
        }
        self.records(name)?.take(count).collect()
    }

    /// Fills `buffer` with the most recent records of `name`, newest
    /// first, `record_size` bytes each.
    ///
    /// Returns the number of records written. Fewer than
    /// `buffer.len() / record_size` means the log ran out; the rest of the
    /// buffer is left untouched.
    pub(crate) fn fill(
        &self,
        name: &VariableName,
        record_size: usize,
        buffer: &mut [u8],
    ) -> CoreResult<usize> {
        let mut filled = 0;
        let records = self.records_sized(name, record_size)?;
        for (slot, record) in buffer.chunks_exact_mut(record_size).zip(records) {
            slot.copy_from_slice(&record?);
            filled += 1;
        }
        Ok(filled)
    }

    /// Counts the segments of `name`, walking backward from the current
    /// index until a segment does not exist.
    ///
    /// # Errors
    ///
    /// Fails if the registration or the log index can't be resolved.
    pub fn count_logs(&self, name: &VariableName) -> CoreResult<usize> {
        self.registry.check_registration(name)?;
        let mut index = self.registry.get_log_index(name)?;
        let mut count = 0;

        loop {
            if !self.dir.exists(&layout::segment_file(name, index))? {
                break;
            }
            count += 1;
            match index.checked_sub(1) {
                Some(older) => index = older,
                None => break,
            }
        }

        Ok(count)
    }
}

impl std::fmt::Debug for SegmentReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentReader").finish_non_exhaustive()
    }
}
