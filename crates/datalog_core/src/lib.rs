//! # Datalog Core
//!
//! Segmented logging of fixed-size records.
//!
//! This crate provides:
//! - A registry of named variables, each with a fixed record size
//! - Append-only segments with size-capped rollover and oldest-first eviction
//! - Backward reads of the most recent records, primed or direct
//! - Open-time verification and repair of persisted state
//!
//! ```rust
//! use datalog_core::{Config, DataLogger};
//!
//! let logger = DataLogger::in_memory(Config::default()).unwrap();
//! logger.register("voltage", 4).unwrap();
//! for v in 0i32..10 {
//!     logger.append("voltage", &v.to_le_bytes()).unwrap();
//! }
//!
//! let latest = logger.read_latest("voltage", 2).unwrap();
//! assert_eq!(latest, vec![9i32.to_le_bytes().to_vec(), 8i32.to_le_bytes().to_vec()]);
//! assert_eq!(logger.count_logs("voltage").unwrap(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
pub mod layout;
mod logger;
mod primer;
mod recovery;
mod registry;
pub mod segment;
mod types;

pub use config::{Config, PaddingPolicy, ReregisterPolicy};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use logger::{DataLogger, ReadOutcome, VariableStats};
pub use primer::ReadPrimer;
pub use recovery::{ConsistencyReport, Finding, Recovery};
pub use registry::{RegisterOutcome, Registry};
pub use segment::{AppendReport, Eviction, ReverseRecords, SegmentReader, SegmentWriter};
pub use types::VariableName;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
