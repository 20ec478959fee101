//! Symlink resolution with cycle detection
//!
//! A link is dereferenced one hop at a time with `readlink(2)` and
//! `lstat(2)` until the chain reaches something that is not a link:
//!
//! ```text
//!   Start ──readlink──► Dereferencing ──lstat: not a link──► Resolved
//!                          │    ▲
//!                          │    └── lstat: link, path unseen
//!                          └──────► Failed (I/O error or path seen twice)
//! ```
//!
//! Every resolution owns a fresh seen-set; nothing is shared between calls.
//! Entries are keyed by the link's real parent directory, so a chain that
//! loops through a directory link is caught even though its spelling grows
//! on every hop.

use crate::error::CrawlError;
use crate::posix::PosixStat;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::trace;

/// Final target of a symlink chain
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Normalized path of the target
    pub path: PathBuf,

    /// `lstat` of the target (never a symlink)
    pub stat: PosixStat,

    /// Number of links dereferenced to get here
    pub hops: usize,
}

enum ResolveState {
    Start(PathBuf),
    Dereferencing(PathBuf),
    Resolved(Resolved),
    Failed(CrawlError),
}

/// Follows symlink chains to their final target
#[derive(Debug, Clone, Copy, Default)]
pub struct SymlinkResolver;

impl SymlinkResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `link` to its final non-link target.
    ///
    /// Fails with [`CrawlError::CircularSymlink`] naming `link` if any path in
    /// the chain repeats, or [`CrawlError::SymlinkResolution`] if a hop cannot
    /// be read or statted.
    pub fn resolve(&self, link: &Path) -> Result<Resolved, CrawlError> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        match canonical_key(link) {
            Ok(key) => {
                seen.insert(key);
            }
            Err(source) => {
                return Err(CrawlError::SymlinkResolution {
                    path: link.to_path_buf(),
                    source,
                })
            }
        }

        let mut hops = 0usize;
        let mut state = ResolveState::Start(link.to_path_buf());

        loop {
            state = match state {
                ResolveState::Start(current) | ResolveState::Dereferencing(current) => {
                    hops += 1;
                    self.step(link, &current, hops, &mut seen)
                }
                ResolveState::Resolved(resolved) => {
                    trace!(link = %link.display(), target = %resolved.path.display(), hops = resolved.hops, "Symlink resolved");
                    return Ok(resolved);
                }
                ResolveState::Failed(error) => return Err(error),
            };
        }
    }

    /// Dereference one hop starting at `current`
    fn step(
        &self,
        link: &Path,
        current: &Path,
        hops: usize,
        seen: &mut HashSet<PathBuf>,
    ) -> ResolveState {
        let candidate = match read_target(current) {
            Ok(candidate) => candidate,
            Err(source) => {
                return ResolveState::Failed(CrawlError::SymlinkResolution {
                    path: link.to_path_buf(),
                    source,
                })
            }
        };

        let meta = match fs::symlink_metadata(&candidate) {
            Ok(meta) => meta,
            Err(source) => {
                return ResolveState::Failed(CrawlError::SymlinkResolution {
                    path: link.to_path_buf(),
                    source,
                })
            }
        };

        if meta.file_type().is_symlink() {
            let key = match canonical_key(&candidate) {
                Ok(key) => key,
                Err(source) => {
                    return ResolveState::Failed(CrawlError::SymlinkResolution {
                        path: link.to_path_buf(),
                        source,
                    })
                }
            };
            if !seen.insert(key) {
                return ResolveState::Failed(CrawlError::CircularSymlink {
                    path: link.to_path_buf(),
                });
            }
            return ResolveState::Dereferencing(candidate);
        }

        ResolveState::Resolved(Resolved {
            stat: PosixStat::from(&meta),
            path: candidate,
            hops,
        })
    }
}

/// Read a link and make its target relative to the link's own directory
fn read_target(link: &Path) -> std::io::Result<PathBuf> {
    let target = fs::read_link(link)?;
    let joined = if target.is_absolute() {
        target
    } else {
        match link.parent() {
            Some(dir) => dir.join(target),
            None => target,
        }
    };
    Ok(lexical_normalize(&joined))
}

/// Identity of a link in the seen set: its real parent directory plus its
/// own name. The last component is kept as is so the link itself is not
/// followed.
fn canonical_key(link: &Path) -> std::io::Result<PathBuf> {
    let Some(name) = link.file_name() else {
        return fs::canonicalize(link);
    };
    let parent = match link.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    Ok(fs::canonicalize(parent)?.join(name))
}

/// Remove `.` and resolve `..` segments without touching the filesystem.
///
/// Leading `..` segments of a relative path are kept; `..` at the root of an
/// absolute path is dropped.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}
