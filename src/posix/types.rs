//! Entry types and file records
//!
//! These types represent filesystem entries as seen by `lstat(2)` and the
//! JSON record emitted for each matched regular file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

/// Type of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EntryType {
    /// Regular file
    File = 0,
    /// Directory
    Directory = 1,
    /// Symbolic link
    Symlink = 2,
    /// Block device
    BlockDevice = 3,
    /// Character device
    CharDevice = 4,
    /// Named pipe (FIFO)
    Fifo = 5,
    /// Unix socket
    Socket = 6,
    /// Unknown type
    Unknown = 255,
}

impl EntryType {
    /// Convert from the file-type bits of a raw `st_mode`
    pub fn from_mode(mode: u32) -> Self {
        match mode & 0o170000 {
            0o100000 => EntryType::File,        // S_IFREG
            0o040000 => EntryType::Directory,   // S_IFDIR
            0o120000 => EntryType::Symlink,     // S_IFLNK
            0o060000 => EntryType::BlockDevice, // S_IFBLK
            0o020000 => EntryType::CharDevice,  // S_IFCHR
            0o010000 => EntryType::Fifo,        // S_IFIFO
            0o140000 => EntryType::Socket,      // S_IFSOCK
            _ => EntryType::Unknown,
        }
    }

    /// Check if this is a regular file
    pub fn is_file(&self) -> bool {
        *self == EntryType::File
    }

    /// Check if this is a directory
    pub fn is_dir(&self) -> bool {
        *self == EntryType::Directory
    }

    /// Check if this is a symbolic link
    pub fn is_symlink(&self) -> bool {
        *self == EntryType::Symlink
    }
}

/// Raw file status, as returned by `lstat(2)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PosixStat {
    /// Inode number
    pub inode: u64,

    /// File mode (type + permissions)
    pub mode: u32,

    /// Owner user ID
    pub uid: u32,

    /// Owner group ID
    pub gid: u32,

    /// Size in bytes
    pub size: i64,

    /// Modification time, seconds since the epoch
    pub mtime: i64,

    /// Nanosecond part of the modification time
    pub mtime_nsec: i64,

    /// Status change time, seconds since the epoch
    pub ctime: i64,

    /// Nanosecond part of the status change time
    pub ctime_nsec: i64,
}

impl PosixStat {
    /// Get the entry type from mode
    pub fn entry_type(&self) -> EntryType {
        EntryType::from_mode(self.mode)
    }
}

impl From<&Metadata> for PosixStat {
    fn from(meta: &Metadata) -> Self {
        Self {
            inode: meta.ino(),
            mode: meta.mode(),
            uid: meta.uid(),
            gid: meta.gid(),
            size: meta.size() as i64,
            mtime: meta.mtime(),
            mtime_nsec: meta.mtime_nsec(),
            ctime: meta.ctime(),
            ctime_nsec: meta.ctime_nsec(),
        }
    }
}

/// Convert a `(seconds, nanoseconds)` stat timestamp to UTC.
///
/// Out-of-range values collapse to the Unix epoch rather than failing the
/// record.
fn to_utc(secs: i64, nsecs: i64) -> DateTime<Utc> {
    let nsecs = nsecs.clamp(0, 999_999_999) as u32;
    DateTime::<Utc>::from_timestamp(secs, nsecs).unwrap_or_default()
}

/// Metadata record for one matched regular file
///
/// Serialized as one JSON object per output line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path as reached by the crawl (the resolved target for followed links)
    #[serde(rename = "file_path")]
    pub path: String,

    /// Inode number
    pub inode: u64,

    /// Size in bytes
    pub size: i64,

    /// Owner user ID
    pub uid: u32,

    /// Owner group ID
    pub gid: u32,

    /// Last modification time
    pub mtime: DateTime<Utc>,

    /// Last status change time
    pub ctime: DateTime<Utc>,
}

impl FileRecord {
    /// Build a record from a raw stat. Pure; performs no I/O.
    pub fn from_stat(path: &Path, stat: &PosixStat) -> Self {
        Self {
            path: path.to_string_lossy().into_owned(),
            inode: stat.inode,
            size: stat.size,
            uid: stat.uid,
            gid: stat.gid,
            mtime: to_utc(stat.mtime, stat.mtime_nsec),
            ctime: to_utc(stat.ctime, stat.ctime_nsec),
        }
    }

    /// Serialize to a single JSON line (without the trailing newline)
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse a record back from a JSON line
    pub fn from_json_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn sample_stat() -> PosixStat {
        PosixStat {
            inode: 12345,
            mode: 0o100644,
            uid: 1000,
            gid: 100,
            size: 4096,
            mtime: 1_700_000_000,
            mtime_nsec: 123_456_789,
            ctime: 1_700_000_100,
            ctime_nsec: 0,
        }
    }

    #[test]
    fn test_entry_type_from_mode() {
        assert_eq!(EntryType::from_mode(0o100644), EntryType::File);
        assert_eq!(EntryType::from_mode(0o040755), EntryType::Directory);
        assert_eq!(EntryType::from_mode(0o120777), EntryType::Symlink);
        assert_eq!(EntryType::from_mode(0o010644), EntryType::Fifo);
        assert_eq!(EntryType::from_mode(0o140755), EntryType::Socket);
        assert_eq!(EntryType::from_mode(0), EntryType::Unknown);
    }

    #[test]
    fn test_record_from_stat() {
        let record = FileRecord::from_stat(Path::new("/data/a.txt"), &sample_stat());

        assert_eq!(record.path, "/data/a.txt");
        assert_eq!(record.inode, 12345);
        assert_eq!(record.size, 4096);
        assert_eq!(record.uid, 1000);
        assert_eq!(record.gid, 100);
        assert_eq!(record.mtime.timestamp(), 1_700_000_000);
        assert_eq!(record.mtime.nanosecond(), 123_456_789);
        assert_eq!(record.ctime.year(), 2023);
    }

    #[test]
    fn test_json_keys() {
        let record = FileRecord::from_stat(Path::new("/x"), &sample_stat());
        let value: serde_json::Value =
            serde_json::from_str(&record.to_json_line().unwrap()).unwrap();

        for key in ["file_path", "inode", "size", "uid", "gid", "mtime", "ctime"] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(value.as_object().unwrap().len(), 7);
        assert!(value["mtime"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_json_line_round_trip() {
        let record = FileRecord::from_stat(Path::new("/data/b.log"), &sample_stat());
        let line = record.to_json_line().unwrap();
        assert!(!line.contains('\n'));

        let parsed = FileRecord::from_json_line(&format!("{}\n", line)).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_out_of_range_timestamp_falls_back_to_epoch() {
        let stat = PosixStat {
            mtime: i64::MAX,
            ..sample_stat()
        };
        let record = FileRecord::from_stat(Path::new("/x"), &stat);
        assert_eq!(record.mtime.timestamp(), 0);
    }

    #[test]
    fn test_stat_from_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"hello").unwrap();

        let meta = std::fs::symlink_metadata(&path).unwrap();
        let stat = PosixStat::from(&meta);
        assert_eq!(stat.entry_type(), EntryType::File);
        assert_eq!(stat.size, 5);
        assert_eq!(stat.inode, meta.ino());
    }
}
