//! # Datalog Storage
//!
//! Namespace directory abstraction for the datalog engine.
//!
//! This crate provides the lowest-level storage layer. A directory is a
//! **flat, name-addressed byte store** scoped to one logging namespace:
//! files are addressed by plain file names (no path separators) and the
//! directory does not interpret what they contain.
//!
//! ## Design Principles
//!
//! - Directories are simple byte stores (create, append, read, remove)
//! - No knowledge of registrations, indices or segment naming
//! - Every mutation can be made durable with an explicit sync
//! - Must be `Send + Sync`; implementations use interior locking
//!
//! ## Available Directories
//!
//! - [`InMemoryDirectory`] - For testing and ephemeral namespaces
//! - [`FileDirectory`] - For persistent storage in an OS directory
//!
//! ## Example
//!
//! ```rust
//! use datalog_storage::{InMemoryDirectory, LogDirectory};
//!
//! let dir = InMemoryDirectory::new();
//! dir.create("temp_0.log").unwrap();
//! let offset = dir.append("temp_0.log", b"abcd").unwrap();
//! assert_eq!(offset, 0);
//! assert_eq!(dir.read_at("temp_0.log", 0, 4).unwrap(), b"abcd");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod directory;
mod error;
mod file;
mod memory;

pub use directory::{validate_file_name, LogDirectory};
pub use error::{StorageError, StorageResult};
pub use file::FileDirectory;
pub use memory::InMemoryDirectory;
