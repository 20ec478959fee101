//! Single-directory visit
//!
//! Lists one directory, classifies every entry by its `lstat` type bits and
//! routes it:
//! - subdirectories are handed back for scheduling
//! - regular files that pass the pattern filter become [`FileRecord`]s
//! - symlinks are resolved first when following is enabled, skipped otherwise
//! - anything else (devices, sockets, fifos) is ignored
//!
//! Per-entry failures are reported and the visit moves on; only a directory
//! that cannot be opened fails the whole visit.
//!
//! When links are followed, every directory is claimed by its real path the
//! first time it is scheduled. A directory reachable through several links is
//! therefore visited once per crawl, and a link whose real target contains
//! the directory holding it is reported as circular.

use crate::error::CrawlError;
use crate::posix::{EntryType, FileRecord, PosixStat};
use crate::walker::filter::PatternFilter;
use crate::walker::queue::DirTask;
use crate::walker::symlink::SymlinkResolver;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Receives what a visit discovers
pub trait VisitSink {
    /// A subdirectory to visit later
    fn schedule(&mut self, task: DirTask);

    /// A matched regular file
    fn emit(&mut self, record: FileRecord);

    /// A recoverable error
    fn report(&mut self, error: CrawlError);
}

/// Counts gathered while visiting one directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirStats {
    /// Entries listed
    pub entries: u64,

    /// Regular files emitted
    pub files: u64,

    /// Total size of emitted files
    pub bytes: u64,

    /// Subdirectories scheduled
    pub dirs: u64,

    /// Symlinks successfully followed
    pub symlinks: u64,

    /// Entries skipped because of an error
    pub errors: u64,
}

/// Visits directories on behalf of the workers
///
/// One visitor serves one crawl; the set of claimed directories is not reset.
#[derive(Debug)]
pub struct DirectoryVisitor {
    filter: PatternFilter,
    resolver: SymlinkResolver,

    /// Real paths of scheduled directories, present only when following links
    claimed: Option<Mutex<HashSet<PathBuf>>>,
}

impl DirectoryVisitor {
    pub fn new(filter: PatternFilter, follow_symlinks: bool) -> Self {
        Self {
            filter,
            resolver: SymlinkResolver::new(),
            claimed: follow_symlinks.then(|| Mutex::new(HashSet::new())),
        }
    }

    /// Build the task for the crawl root, claiming it when links are followed
    pub fn root_task(&self, root: PathBuf) -> DirTask {
        let Some(claimed) = &self.claimed else {
            return DirTask::root(root, None);
        };

        let canonical = fs::canonicalize(&root).unwrap_or_else(|_| root.clone());
        claimed.lock().insert(canonical.clone());
        DirTask::root(root, Some(canonical))
    }

    /// Visit one directory, pushing discoveries into `sink`
    pub fn visit<S: VisitSink>(&self, task: &DirTask, sink: &mut S) -> Result<DirStats, CrawlError> {
        let listing = fs::read_dir(&task.path).map_err(|source| CrawlError::DirectoryRead {
            path: task.path.clone(),
            source,
        })?;

        let mut stats = DirStats::default();

        for entry in listing {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) => {
                    stats.errors += 1;
                    sink.report(CrawlError::DirectoryRead {
                        path: task.path.clone(),
                        source,
                    });
                    continue;
                }
            };
            stats.entries += 1;

            let path = child_path(&task.path, &entry.file_name());
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(source) => {
                    stats.errors += 1;
                    sink.report(CrawlError::Metadata { path, source });
                    continue;
                }
            };

            self.visit_entry(task, path, PosixStat::from(&meta), &mut stats, sink);
        }

        Ok(stats)
    }

    fn visit_entry<S: VisitSink>(
        &self,
        task: &DirTask,
        path: PathBuf,
        stat: PosixStat,
        stats: &mut DirStats,
        sink: &mut S,
    ) {
        let (target, stat, via_link) = if stat.entry_type().is_symlink() {
            if self.claimed.is_none() {
                trace!(path = %path.display(), "Skipping symlink");
                return;
            }
            match self.resolver.resolve(&path) {
                Ok(resolved) => {
                    stats.symlinks += 1;
                    (resolved.path, resolved.stat, true)
                }
                Err(error) => {
                    stats.errors += 1;
                    sink.report(error);
                    return;
                }
            }
        } else {
            (path.clone(), stat, false)
        };

        match stat.entry_type() {
            EntryType::Directory => match self.child_task(task, &path, target, via_link) {
                Ok(Some(child)) => {
                    stats.dirs += 1;
                    sink.schedule(child);
                }
                Ok(None) => {}
                Err(error) => {
                    stats.errors += 1;
                    sink.report(error);
                }
            },
            EntryType::File => {
                if self.filter.is_match(&target) {
                    stats.files += 1;
                    stats.bytes += stat.size.max(0) as u64;
                    sink.emit(FileRecord::from_stat(&target, &stat));
                }
            }
            other => {
                trace!(path = %target.display(), entry_type = ?other, "Skipping special file");
            }
        }
    }

    /// Build the task for a subdirectory.
    ///
    /// `Ok(None)` means the directory was already scheduled by another path.
    fn child_task(
        &self,
        task: &DirTask,
        link: &Path,
        dir: PathBuf,
        via_link: bool,
    ) -> Result<Option<DirTask>, CrawlError> {
        let (Some(claimed), Some(parent)) = (&self.claimed, &task.canonical) else {
            return Ok(Some(task.child(dir, None)));
        };

        let canonical = if via_link {
            fs::canonicalize(&dir).map_err(|source| CrawlError::SymlinkResolution {
                path: link.to_path_buf(),
                source,
            })?
        } else {
            match dir.file_name() {
                Some(name) => parent.join(name),
                None => dir.clone(),
            }
        };

        if via_link && parent.starts_with(&canonical) {
            return Err(CrawlError::CircularSymlink {
                path: link.to_path_buf(),
            });
        }

        if !claimed.lock().insert(canonical.clone()) {
            trace!(path = %link.display(), target = %canonical.display(), "Directory already scheduled");
            return Ok(None);
        }

        Ok(Some(task.child(dir, Some(canonical))))
    }
}

/// Join an entry name onto its directory, dropping a bare `.` prefix
fn child_path(dir: &Path, name: &OsStr) -> PathBuf {
    if dir == Path::new(".") {
        PathBuf::from(name)
    } else {
        dir.join(name)
    }
}
