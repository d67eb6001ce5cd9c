//! Logger configuration.

use crate::error::{CoreError, CoreResult};

/// How records shorter than the registered size are filled out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaddingPolicy {
    /// Repeat the data's own trailing byte.
    ///
    /// Matches what earlier deployments of this logger wrote to disk.
    #[default]
    RepeatLastByte,
    /// Fill with `0x00`.
    Zero,
}

/// What `register` does when the name is already registered with another size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReregisterPolicy {
    /// Fail with `AlreadyRegistered`, leaving everything untouched.
    #[default]
    Reject,
    /// Delete every segment of the old registration and start over.
    Purge,
}

/// Configuration for opening a logger.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum size of a single segment file in bytes.
    pub max_segment_size: u64,

    /// Maximum bytes kept per variable across all of its segments.
    pub max_log_set_size: u64,

    /// Largest record size accepted at registration.
    pub max_record_size: usize,

    /// Longest accepted variable name in bytes.
    pub max_name_length: usize,

    /// Padding applied to short records.
    pub padding: PaddingPolicy,

    /// Behaviour on conflicting re-registration.
    pub reregister: ReregisterPolicy,

    /// Whether to create the logging directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to repair inconsistencies found when opening.
    pub repair_on_open: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_segment_size: 1024 * 1024,     // 1 MiB
            max_log_set_size: 5 * 1024 * 1024, // 5 MiB
            max_record_size: 4096,
            max_name_length: 64,
            padding: PaddingPolicy::default(),
            reregister: ReregisterPolicy::default(),
            create_if_missing: true,
            repair_on_open: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets maximum segment file size.
    #[must_use]
    pub const fn max_segment_size(mut self, size: u64) -> Self {
        self.max_segment_size = size;
        self
    }

    /// Sets maximum total bytes retained per variable.
    #[must_use]
    pub const fn max_log_set_size(mut self, size: u64) -> Self {
        self.max_log_set_size = size;
        self
    }

    /// Sets the largest registrable record size.
    #[must_use]
    pub const fn max_record_size(mut self, size: usize) -> Self {
        self.max_record_size = size;
        self
    }

    /// Sets the longest accepted variable name.
    #[must_use]
    pub const fn max_name_length(mut self, len: usize) -> Self {
        self.max_name_length = len;
        self
    }

    /// Sets the padding policy.
    #[must_use]
    pub const fn padding(mut self, policy: PaddingPolicy) -> Self {
        self.padding = policy;
        self
    }

    /// Sets the re-registration policy.
    #[must_use]
    pub const fn reregister(mut self, policy: ReregisterPolicy) -> Self {
        self.reregister = policy;
        self
    }

    /// Sets whether to create the directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to repair inconsistencies on open.
    #[must_use]
    pub const fn repair_on_open(mut self, value: bool) -> Self {
        self.repair_on_open = value;
        self
    }

    /// Number of segments kept per variable.
    #[must_use]
    pub const fn retention_count(&self) -> u64 {
        if self.max_segment_size == 0 {
            return 0;
        }
        self.max_log_set_size / self.max_segment_size
    }

    /// Checks that the limits are usable together.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a limit is zero, a record could not fit
    /// in a segment, or fewer than one segment would be retained.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_segment_size == 0 {
            return Err(CoreError::invalid_config("max_segment_size must be positive"));
        }
        if self.max_record_size == 0 {
            return Err(CoreError::invalid_config("max_record_size must be positive"));
        }
        if self.max_name_length == 0 {
            return Err(CoreError::invalid_config("max_name_length must be positive"));
        }
        if self.max_record_size as u64 > self.max_segment_size {
            return Err(CoreError::invalid_config(format!(
                "max_record_size {} exceeds max_segment_size {}",
                self.max_record_size, self.max_segment_size
            )));
        }
        if self.retention_count() == 0 {
            return Err(CoreError::invalid_config(format!(
                "max_log_set_size {} is smaller than max_segment_size {}",
                self.max_log_set_size, self.max_segment_size
            )));
        }
        Ok(())
    }
}
