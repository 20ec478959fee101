//! POSIX entry types and metadata extraction
//!
//! Raw `lstat`/`stat` results are captured in [`PosixStat`] and mapped into
//! the immutable [`FileRecord`] that is emitted for every matched file.

pub mod types;

pub use types::{EntryType, FileRecord, PosixStat};
