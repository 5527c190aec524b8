//! Append-only journal inside the database file.
//!
//! Every committed transaction is one journal record. Replaying the journal
//! from the start rebuilds every partition and entry.
//!
//! ## File Layout
//!
//! ```text
//! | file magic "BUCKETDB" (8) | format version (2) | reserved (2) |
//! | record | record | ...
//! ```
//!
//! ## Record Format
//!
//! ```text
//! | magic "BREC" (4) | version (2) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! The payload is an operation count followed by operations
//! (`CreatePartition`, `Put`, `Delete`), each a kind byte and
//! length-prefixed byte strings.
//!
//! ## Recovery Policy
//!
//! - A truncated trailing record (crash mid-append) is the clean end of the
//!   journal and is cut off on open.
//! - A checksum mismatch, bad magic, unknown operation or newer version is
//!   fatal: the database refuses to open rather than lose data silently.

mod reader;
mod record;
mod writer;

pub use reader::{JournalReader, ReplayedRecord};
pub use record::{
    checksum, JournalOp, JournalRecord, ValueSpan, FILE_HEADER_SIZE, FILE_MAGIC, FORMAT_VERSION,
    RECORD_HEADER_SIZE,
};
pub(crate) use record::file_header;
pub use writer::{Committed, JournalWriter};
