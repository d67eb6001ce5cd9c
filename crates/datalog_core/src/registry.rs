//! Variable registry.
//!
//! The registry is the single source of truth for each variable's record
//! size (`<name>.reg`) and current writable segment index (`<name>.idx`).
//! Both are stored as one text integer and replaced atomically.

use crate::config::{Config, ReregisterPolicy};
use crate::error::{CoreError, CoreResult};
use crate::layout;
use crate::types::VariableName;
use datalog_storage::LogDirectory;
use std::sync::Arc;

/// What a call to [`Registry::register`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// A new registration was written.
    Created,
    /// The name was already registered with the same size; nothing changed.
    Unchanged,
    /// A registration with another size was replaced and its segments deleted.
    Purged {
        /// Record size of the replaced registration, if it was readable.
        previous_size: Option<usize>,
        /// Number of segment files deleted.
        removed_segments: usize,
    },
}

/// Persists record sizes and log indices.
#[derive(Clone)]
pub struct Registry {
    dir: Arc<dyn LogDirectory>,
}

impl Registry {
    /// Creates a registry over `dir`.
    pub fn new(dir: Arc<dyn LogDirectory>) -> Self {
        Self { dir }
    }

    /// Registers `name` with a fixed `record_size`.
    ///
    /// A fresh registration persists the size, sets the index to 0 and
    /// creates the empty segment 0. The `.reg` file is written last, so a
    /// crash part-way leaves the name unregistered.
    ///
    /// # Errors
    ///
    /// - `InvalidRecordSize` if `record_size` is outside `(0, max_record_size]`
    /// - `AlreadyRegistered` if registered with another size under
    ///   [`ReregisterPolicy::Reject`]
    /// - `CorruptRegistration` if the existing registration is unreadable
    ///   under [`ReregisterPolicy::Reject`]
    pub fn register(
        &self,
        name: &VariableName,
        record_size: usize,
        config: &Config,
    ) -> CoreResult<RegisterOutcome> {
        if record_size == 0 || record_size > config.max_record_size {
            return Err(CoreError::InvalidRecordSize {
                size: record_size,
                max: config.max_record_size,
            });
        }

        let existing = match self.lookup(name) {
            Ok(existing) => existing,
            Err(CoreError::CorruptRegistration { .. })
                if config.reregister == ReregisterPolicy::Purge =>
            {
                return self.purge_and_register(name, None, record_size);
            }
            Err(e) => return Err(e),
        };

        match existing {
            None => {
                let stray = self.remove_segments(name)?;
                if stray > 0 {
                    tracing::warn!(name = %name, stray, "removed stray segments of an unregistered name");
                }
                self.write_fresh(name, record_size)?;
                tracing::info!(name = %name, record_size, "registered variable");
                Ok(RegisterOutcome::Created)
            }
            Some(size) if size == record_size => {
                tracing::warn!(
                    name = %name,
                    record_size,
                    "variable already registered; keeping existing index and segments"
                );
                Ok(RegisterOutcome::Unchanged)
            }
            Some(size) => match config.reregister {
                ReregisterPolicy::Reject => Err(CoreError::AlreadyRegistered {
                    name: name.to_string(),
                    existing: size,
                    requested: record_size,
                }),
                ReregisterPolicy::Purge => self.purge_and_register(name, Some(size), record_size),
            },
        }
    }

    fn purge_and_register(
        &self,
        name: &VariableName,
        previous_size: Option<usize>,
        record_size: usize,
    ) -> CoreResult<RegisterOutcome> {
        self.dir.remove(&layout::registration_file(name))?;
        let removed_segments = self.remove_segments(name)?;
        self.write_fresh(name, record_size)?;
        tracing::warn!(
            name = %name,
            ?previous_size,
            record_size,
            removed_segments,
            "re-registered variable with a new size; old segments purged"
        );
        Ok(RegisterOutcome::Purged {
            previous_size,
            removed_segments,
        })
    }

    fn write_fresh(&self, name: &VariableName, record_size: usize) -> CoreResult<()> {
        let head = layout::segment_file(name, 0);
        self.dir
            .create(&head)
            .map_err(|source| CoreError::SegmentOpenFailed { file: head, source })?;
        self.set_log_index(name, 0)?;
        self.dir
            .write_string(&layout::registration_file(name), &record_size.to_string())?;
        Ok(())
    }

    /// Removes the registration, index and every segment of `name`.
    ///
    /// Returns the number of segments deleted.
    ///
    /// # Errors
    ///
    /// Returns `NotRegistered` if `name` has no registration file.
    pub fn unregister(&self, name: &VariableName) -> CoreResult<usize> {
        let reg = layout::registration_file(name);
        if !self.dir.exists(&reg)? {
            return Err(CoreError::NotRegistered {
                name: name.to_string(),
            });
        }

        self.dir.remove(&reg)?;
        self.dir.remove(&layout::index_file(name))?;
        let removed = self.remove_segments(name)?;
        tracing::info!(name = %name, removed, "unregistered variable");
        Ok(removed)
    }

    /// Returns the registered record size of `name`.
    ///
    /// # Errors
    ///
    /// - `NotRegistered` if no registration exists
    /// - `CorruptRegistration` if the stored value is not a positive integer
    pub fn check_registration(&self, name: &VariableName) -> CoreResult<usize> {
        self.lookup(name)?.ok_or_else(|| CoreError::NotRegistered {
            name: name.to_string(),
        })
    }

    /// Returns the registered record size, or `None` if unregistered.
    fn lookup(&self, name: &VariableName) -> CoreResult<Option<usize>> {
        let Some(text) = self.dir.read_string(&layout::registration_file(name))? else {
            return Ok(None);
        };

        let size: i64 = text.trim().parse().map_err(|_| {
            CoreError::corrupt_registration(name.as_str(), format!("not an integer: {:?}", text.trim()))
        })?;

        if size <= 0 {
            return Err(CoreError::corrupt_registration(
                name.as_str(),
                format!("non-positive record size {size}"),
            ));
        }

        usize::try_from(size)
            .map(Some)
            .map_err(|_| CoreError::corrupt_registration(name.as_str(), "record size out of range"))
    }

    /// Returns the current writable segment index of `name`.
    ///
    /// # Errors
    ///
    /// Returns `IndexUnavailable` if the index is missing or unreadable.
    pub fn get_log_index(&self, name: &VariableName) -> CoreResult<u64> {
        let text = self
            .dir
            .read_string(&layout::index_file(name))
            .map_err(|e| CoreError::index_unavailable(name.as_str(), e.to_string()))?
            .ok_or_else(|| CoreError::index_unavailable(name.as_str(), "index file missing"))?;

        text.trim().parse().map_err(|_| {
            CoreError::index_unavailable(name.as_str(), format!("not an index: {:?}", text.trim()))
        })
    }

    /// Increments the index of `name` by one, persists it and returns it.
    ///
    /// # Errors
    ///
    /// Returns `IndexUnavailable` if the index cannot be read or written.
    pub fn iterate_log_index(&self, name: &VariableName) -> CoreResult<u64> {
        let next = self
            .get_log_index(name)?
            .checked_add(1)
            .ok_or_else(|| CoreError::index_unavailable(name.as_str(), "index overflow"))?;
        self.set_log_index(name, next)?;
        tracing::debug!(name = %name, index = next, "advanced log index");
        Ok(next)
    }

    /// Persists `index` as the current index of `name`.
    pub(crate) fn set_log_index(&self, name: &VariableName, index: u64) -> CoreResult<()> {
        self.dir
            .write_string(&layout::index_file(name), &index.to_string())
            .map_err(|e| CoreError::index_unavailable(name.as_str(), e.to_string()))
    }

    /// Lists all registered variable names, sorted.
    pub fn registered_names(&self) -> CoreResult<Vec<String>> {
        Ok(self
            .dir
            .list()?
            .iter()
            .filter_map(|file| layout::registered_name(file))
            .map(str::to_string)
            .collect())
    }

    /// Lists the indices of every segment of `name` on disk, ascending.
    pub fn segment_indices(&self, name: &VariableName) -> CoreResult<Vec<u64>> {
        let mut indices: Vec<u64> = self
            .dir
            .list()?
            .iter()
            .filter_map(|file| layout::segment_index(name, file))
            .collect();
        indices.sort_unstable();
        Ok(indices)
    }

    fn remove_segments(&self, name: &VariableName) -> CoreResult<usize> {
        let mut removed = 0;
        for index in self.segment_indices(name)? {
            if self.dir.remove(&layout::segment_file(name, index))? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").finish_non_exhaustive()
    }
}
