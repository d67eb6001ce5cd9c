//! Segment storage for logged records.
//!
//! A segment is an append-only file of fixed-size records for one
//! variable. The writer appends to the segment at the current index and
//! rolls over to the next index when a record would not fit; the reader
//! walks segments backward from the current index.
//!
//! ## Segment Format
//!
//! ```text
//! | record 0 (record_size) | record 1 (record_size) | ... | record n-1 |
//! ```
//!
//! Records are unframed. A segment whose length is not a multiple of the
//! record size has a torn tail from an interrupted write; the partial
//! bytes are ignored by readers and trimmed by the writer.

mod reader;
mod record;
mod writer;

pub use reader::{ReverseRecords, SegmentReader};
pub use record::pad_record;
pub use writer::{AppendReport, Eviction, SegmentWriter};
