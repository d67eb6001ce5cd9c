//! Consistency checks between the log index and segment files.
//!
//! A rollover writes the advanced index before the new segment exists, and
//! an append can be cut short mid-record. Neither is atomic with respect
//! to the other files, so after a crash the persisted state may disagree
//! with itself. [`Recovery::verify`] reports such states;
//! [`Recovery::repair`] fixes them.
//!
//! ## Findings
//!
//! - `MissingHeadSegment`: no segment at the persisted index. Repair
//!   creates it empty.
//! - `SegmentsAheadOfIndex`: contiguous segments exist past the index.
//!   Repair advances the index to the highest of them.
//! - `TornTail`: a segment length that is not a whole number of records.
//!   Repair truncates the partial record.
//! - `UnreadableIndex`: the index file is missing or garbled. Repair
//!   rewrites it as the highest segment on disk (or 0).
//! - `CorruptRegistration`: the record size is unreadable. Not repairable;
//!   re-register with a purge policy instead.

use crate::error::{CoreError, CoreResult};
use crate::layout;
use crate::registry::Registry;
use crate::types::VariableName;
use datalog_storage::LogDirectory;
use std::fmt;
use std::sync::Arc;

/// One inconsistency found for a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// The registration file is unreadable.
    CorruptRegistration {
        /// Why it could not be read.
        message: String,
    },
    /// The index file is missing or unreadable.
    UnreadableIndex {
        /// Why it could not be read.
        message: String,
        /// Index repair would write.
        fallback: u64,
    },
    /// No segment exists at the persisted index.
    MissingHeadSegment {
        /// The persisted index.
        index: u64,
    },
    /// Segments exist beyond the persisted index.
    SegmentsAheadOfIndex {
        /// The persisted index.
        index: u64,
        /// Highest index of the contiguous run that follows it.
        highest: u64,
    },
    /// A segment ends in a partial record.
    TornTail {
        /// Index of the segment.
        index: u64,
        /// Its size in bytes.
        size: u64,
        /// Bytes past the last whole record.
        excess: u64,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CorruptRegistration { message } => write!(f, "corrupt registration: {message}"),
            Self::UnreadableIndex { message, fallback } => {
                write!(f, "unreadable index ({message}); fallback {fallback}")
            }
            Self::MissingHeadSegment { index } => write!(f, "no segment at current index {index}"),
            Self::SegmentsAheadOfIndex { index, highest } => {
                write!(f, "segments {}..={highest} exist past index {index}", index + 1)
            }
            Self::TornTail {
                index,
                size,
                excess,
            } => write!(f, "segment {index} ({size} bytes) ends in a {excess}-byte partial record"),
        }
    }
}

/// Result of a consistency check for one variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// The variable checked.
    pub name: String,
    /// Every inconsistency found.
    pub findings: Vec<Finding>,
    /// Whether every finding was fixed.
    pub repaired: bool,
    /// Findings a repair left in place.
    pub unrepaired: Vec<Finding>,
}

impl ConsistencyReport {
    /// Returns true if nothing was found.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Verifies and repairs persisted state.
#[derive(Clone)]
pub struct Recovery {
    dir: Arc<dyn LogDirectory>,
    registry: Registry,
}

impl Recovery {
    /// Creates a recovery helper over `dir`.
    pub fn new(dir: Arc<dyn LogDirectory>, registry: Registry) -> Self {
        Self { dir, registry }
    }

    /// Checks `name` without modifying anything.
    ///
    /// # Errors
    ///
    /// `NotRegistered` if `name` has no registration, or a storage error.
    pub fn verify(&self, name: &VariableName) -> CoreResult<ConsistencyReport> {
        let mut findings = Vec::new();

        let record_size = match self.registry.check_registration(name) {
            Ok(size) => Some(size),
            Err(CoreError::CorruptRegistration { message, .. }) => {
                findings.push(Finding::CorruptRegistration { message });
                None
            }
            Err(e) => return Err(e),
        };

        let segments = self.registry.segment_indices(name)?;

        let index = match self.registry.get_log_index(name) {
            Ok(index) => index,
            Err(CoreError::IndexUnavailable { message, .. }) => {
                let fallback = segments.last().copied().unwrap_or(0);
                findings.push(Finding::UnreadableIndex { message, fallback });
                fallback
            }
            Err(e) => return Err(e),
        };

        let mut highest = index;
        while segments.binary_search(&(highest + 1)).is_ok() {
            highest += 1;
        }
        if highest > index {
            findings.push(Finding::SegmentsAheadOfIndex { index, highest });
        } else if segments.binary_search(&index).is_err() {
            findings.push(Finding::MissingHeadSegment { index });
        }

        if let Some(record_size) = record_size {
            for &segment in &segments {
                let size = self
                    .dir
                    .size(&layout::segment_file(name, segment))?
                    .unwrap_or(0);
                let excess = size % record_size as u64;
                if excess != 0 {
                    findings.push(Finding::TornTail {
                        index: segment,
                        size,
                        excess,
                    });
                }
            }
        }

        Ok(ConsistencyReport {
            name: name.to_string(),
            findings,
            repaired: false,
            unrepaired: Vec::new(),
        })
    }

    /// Checks `name` and fixes every repairable finding.
    ///
    /// Returns the findings as they were before repair. Findings that can't
    /// be fixed here are listed in [`ConsistencyReport::unrepaired`] and
    /// leave `repaired` false.
    ///
    /// # Errors
    ///
    /// As [`Self::verify`], or the first failing fix.
    pub fn repair(&self, name: &VariableName) -> CoreResult<ConsistencyReport> {
        let mut report = self.verify(name)?;

        for finding in &report.findings {
            tracing::warn!(name = %name, %finding, "repairing");
            match finding {
                Finding::CorruptRegistration { .. } => {
                    tracing::warn!(name = %name, "registration cannot be repaired; re-register with purge");
                    report.unrepaired.push(finding.clone());
                }
                Finding::UnreadableIndex { fallback, .. } => {
                    self.registry.set_log_index(name, *fallback)?;
                }
                Finding::SegmentsAheadOfIndex { highest, .. } => {
                    self.registry.set_log_index(name, *highest)?;
                }
                Finding::MissingHeadSegment { index } => {
                    let file = layout::segment_file(name, *index);
                    self.dir
                        .create(&file)
                        .map_err(|source| CoreError::SegmentOpenFailed { file, source })?;
                }
                Finding::TornTail {
                    index,
                    size,
                    excess,
                } => {
                    self.dir
                        .truncate(&layout::segment_file(name, *index), size - excess)?;
                }
            }
        }

        report.repaired = report.unrepaired.is_empty();
        Ok(report)
    }
}

impl fmt::Debug for Recovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recovery").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use datalog_storage::InMemoryDirectory;

    fn setup() -> (Arc<InMemoryDirectory>, Registry, Recovery, VariableName) {
        let dir = Arc::new(InMemoryDirectory::new());
        let registry = Registry::new(dir.clone());
        let recovery = Recovery::new(dir.clone(), registry.clone());
        let name = VariableName::parse("temp", 64).unwrap();
        registry.register(&name, 4, &Config::default()).unwrap();
        (dir, registry, recovery, name)
    }

    #[test]
    fn fresh_registration_is_consistent() {
        let (_dir, _registry, recovery, name) = setup();
        let report = recovery.verify(&name).unwrap();
        assert!(report.is_consistent());
        assert!(!report.repaired);
    }

    #[test]
    fn interrupted_rollover_detected_and_repaired() {
        let (dir, registry, recovery, name) = setup();
        registry.iterate_log_index(&name).unwrap();

        let report = recovery.verify(&name).unwrap();
        assert_eq!(report.findings, vec![Finding::MissingHeadSegment { index: 1 }]);

        recovery.repair(&name).unwrap();
        assert_eq!(dir.contents("temp_1.log"), Some(Vec::new()));
        assert!(recovery.verify(&name).unwrap().is_consistent());
    }

    #[test]
    fn segments_ahead_advance_index() {
        let (dir, registry, recovery, name) = setup();
        dir.put_raw("temp_1.log", vec![0; 4]);
        dir.put_raw("temp_2.log", vec![0; 4]);
        dir.put_raw("temp_4.log", vec![0; 4]);

        let report = recovery.verify(&name).unwrap();
        assert_eq!(
            report.findings,
            vec![Finding::SegmentsAheadOfIndex { index: 0, highest: 2 }]
        );

        recovery.repair(&name).unwrap();
        assert_eq!(registry.get_log_index(&name).unwrap(), 2);
    }

    #[test]
    fn torn_tail_truncated() {
        let (dir, _registry, recovery, name) = setup();
        dir.put_raw("temp_0.log", vec![1, 2, 3, 4, 5, 6, 7]);

        let report = recovery.repair(&name).unwrap();
        assert_eq!(
            report.findings,
            vec![Finding::TornTail {
                index: 0,
                size: 7,
                excess: 3
            }]
        );
        assert!(report.repaired);
        assert_eq!(dir.contents("temp_0.log"), Some(vec![1, 2, 3, 4]));
    }

    #[test]
    fn unreadable_index_rewritten() {
        let (dir, registry, recovery, name) = setup();
        dir.put_raw("temp_1.log", Vec::new());
        dir.put_raw("temp.idx", b"??".to_vec());

        let report = recovery.verify(&name).unwrap();
        assert!(matches!(
            report.findings.as_slice(),
            [Finding::UnreadableIndex { fallback: 1, .. }]
        ));

        recovery.repair(&name).unwrap();
        assert_eq!(registry.get_log_index(&name).unwrap(), 1);
    }

    #[test]
    fn corrupt_registration_reported() {
        let (dir, _registry, recovery, name) = setup();
        dir.put_raw("temp.reg", b"0".to_vec());

        let report = recovery.repair(&name).unwrap();
        assert!(matches!(
            report.findings.as_slice(),
            [Finding::CorruptRegistration { .. }]
        ));
        assert!(!report.repaired);
        assert_eq!(report.unrepaired, report.findings);
        assert_eq!(dir.contents("temp.reg"), Some(b"0".to_vec()));
    }

    #[test]
    fn partial_repair_is_not_reported_as_repaired() {
        let (dir, _registry, recovery, name) = setup();
        dir.put_raw("temp.reg", b"x".to_vec());
        dir.put_raw("temp_1.log", Vec::new());

        let report = recovery.repair(&name).unwrap();
        assert_eq!(report.findings.len(), 2);
        assert!(!report.repaired);
        assert!(matches!(
            report.unrepaired.as_slice(),
            [Finding::CorruptRegistration { .. }]
        ));
        assert!(recovery.verify(&name).unwrap().findings.iter().all(|f| matches!(
            f,
            Finding::CorruptRegistration { .. }
        )));
    }

    #[test]
    fn unregistered_name_fails() {
        let (_dir, _registry, recovery, _name) = setup();
        let ghost = VariableName::parse("ghost", 64).unwrap();
        assert!(matches!(
            recovery.verify(&ghost),
            Err(CoreError::NotRegistered { .. })
        ));
    }

    #[test]
    fn findings_render() {
        let finding = Finding::SegmentsAheadOfIndex { index: 3, highest: 5 };
        assert_eq!(finding.to_string(), "segments 4..=5 exist past index 3");
    }
}
