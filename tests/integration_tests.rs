//! Integration tests for posix-crawler
//!
//! Every test builds a throwaway tree with tempfile and crawls it end to end
//! through the coordinator, reading back the JSON lines it wrote.

use posix_crawler::{CrawlConfig, CrawlCoordinator, CrawlError, CrawlOutcome, FileRecord};
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn records(&self) -> Vec<FileRecord> {
        let bytes = self.0.lock().unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        text.lines()
            .map(|line| FileRecord::from_json_line(line).unwrap())
            .collect()
    }

    fn paths(&self) -> BTreeSet<String> {
        self.records().into_iter().map(|r| r.path).collect()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn crawl(config: CrawlConfig) -> (CrawlOutcome, SharedBuf) {
    let buf = SharedBuf::default();
    let outcome = CrawlCoordinator::new(config).run(buf.clone()).unwrap();
    (outcome, buf)
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn test_pattern_selects_matching_files() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir(root.join("d1")).unwrap();
    fs::create_dir(root.join("d2")).unwrap();
    fs::write(root.join("d1/a.txt"), b"aaaa").unwrap();
    fs::write(root.join("d1/b.log"), b"bb").unwrap();
    fs::write(root.join("d2/c.txt"), b"c").unwrap();

    let config = CrawlConfig::new(root)
        .with_pattern(r"\.txt$")
        .unwrap()
        .with_concurrency(4);
    let (outcome, buf) = crawl(config);

    assert!(outcome.is_clean());
    let expected: BTreeSet<_> = [root.join("d1/a.txt"), root.join("d2/c.txt")]
        .iter()
        .map(|p| path_str(p))
        .collect();
    assert_eq!(buf.paths(), expected);
    assert_eq!(outcome.stats.records_written, 2);
    assert_eq!(outcome.stats.dirs, 3);
}

#[test]
fn test_record_carries_file_metadata() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("data.bin");
    fs::write(&file, vec![0u8; 4096]).unwrap();
    let meta = fs::metadata(&file).unwrap();

    let (_, buf) = crawl(CrawlConfig::new(dir.path()));
    let records = buf.records();

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.path, path_str(&file));
    assert_eq!(record.size, 4096);

    use std::os::unix::fs::MetadataExt;
    assert_eq!(record.inode, meta.ino());
    assert_eq!(record.uid, meta.uid());
    assert_eq!(record.gid, meta.gid());
    assert_eq!(record.mtime.timestamp(), meta.mtime());
}

#[test]
fn test_output_lines_are_json_objects() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("one"), b"1").unwrap();

    let (_, buf) = crawl(CrawlConfig::new(dir.path()));
    let bytes = buf.0.lock().unwrap().clone();
    let text = String::from_utf8(bytes).unwrap();

    assert!(text.ends_with('\n'));
    let value: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
    let object = value.as_object().unwrap();
    for key in ["file_path", "inode", "size", "uid", "gid", "mtime", "ctime"] {
        assert!(object.contains_key(key), "missing key {}", key);
    }
}

#[test]
fn test_unreadable_directory_is_partial_success() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let locked = root.join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("hidden"), b"x").unwrap();
    fs::write(root.join("visible"), b"y").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can read it anyway
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let (outcome, buf) = crawl(CrawlConfig::new(root));
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(outcome.stats.completed);
    assert_eq!(buf.paths(), BTreeSet::from([path_str(&root.join("visible"))]));

    let errors = outcome.report.errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], CrawlError::DirectoryRead { .. }));
    assert_eq!(errors[0].path(), locked.as_path());
    assert!(outcome.into_result().is_err());
}

#[test]
fn test_symlink_cycle_is_reported() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    symlink(root.join("b"), root.join("a")).unwrap();
    symlink(root.join("a"), root.join("b")).unwrap();
    fs::write(root.join("plain"), b"p").unwrap();

    let (outcome, buf) = crawl(CrawlConfig::new(root));

    assert!(outcome.stats.completed);
    assert_eq!(buf.paths(), BTreeSet::from([path_str(&root.join("plain"))]));
    assert!(!outcome.report.is_empty());
    assert!(outcome
        .report
        .errors()
        .iter()
        .all(|e| matches!(e, CrawlError::CircularSymlink { .. })));
}

#[test]
fn test_link_to_ancestor_terminates() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir(root.join("sub")).unwrap();
    fs::write(root.join("sub/f"), b"f").unwrap();
    symlink(root, root.join("sub/up")).unwrap();

    let (outcome, buf) = crawl(CrawlConfig::new(root));

    assert!(outcome.stats.completed);
    assert_eq!(buf.paths(), BTreeSet::from([path_str(&root.join("sub/f"))]));

    let errors = outcome.report.errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], CrawlError::CircularSymlink { .. }));
    assert_eq!(errors[0].path(), root.join("sub/up").as_path());
}

#[test]
fn test_cross_linked_directories_visited_once() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    for i in 0..6 {
        let sub = root.join(format!("d{}", i));
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("f.txt"), b"x").unwrap();
    }
    for i in 0..6 {
        for j in (0..6).filter(|&j| j != i) {
            symlink(format!("../d{}", j), root.join(format!("d{}/l{}", i, j))).unwrap();
        }
    }

    let (outcome, buf) = crawl(CrawlConfig::new(root).with_concurrency(4));

    assert!(outcome.is_clean());
    assert_eq!(outcome.stats.dirs, 7);
    assert_eq!(buf.records().len(), 6);
}

#[test]
fn test_directory_reached_by_link_and_name_visited_once() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir(root.join("real")).unwrap();
    fs::write(root.join("real/a.txt"), b"a").unwrap();
    symlink(root.join("real"), root.join("alias")).unwrap();

    let (outcome, buf) = crawl(CrawlConfig::new(root));

    assert!(outcome.is_clean());
    assert_eq!(outcome.stats.dirs, 2);
    assert_eq!(buf.paths(), BTreeSet::from([path_str(&root.join("real/a.txt"))]));
}

#[test]
fn test_followed_link_outside_tree() {
    let outside = tempdir().unwrap();
    let target = outside.path().join("target.txt");
    fs::write(&target, b"outside").unwrap();

    let dir = tempdir().unwrap();
    symlink(&target, dir.path().join("link.txt")).unwrap();

    let (outcome, buf) = crawl(CrawlConfig::new(dir.path()));
    assert!(outcome.is_clean());
    assert_eq!(outcome.stats.symlinks, 1);

    let records = buf.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].path, path_str(&target));
    assert_eq!(records[0].size, 7);
}

#[test]
fn test_no_follow_skips_links() {
    let outside = tempdir().unwrap();
    let target = outside.path().join("target.txt");
    fs::write(&target, b"outside").unwrap();

    let dir = tempdir().unwrap();
    symlink(&target, dir.path().join("link.txt")).unwrap();
    symlink(dir.path().join("missing"), dir.path().join("dangling")).unwrap();

    let config = CrawlConfig::new(dir.path()).with_follow_symlinks(false);
    let (outcome, buf) = crawl(config);

    assert!(outcome.is_clean());
    assert!(buf.records().is_empty());
    assert_eq!(outcome.stats.symlinks, 0);
}

#[test]
fn test_same_target_emitted_once() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("real"), b"r").unwrap();
    symlink(root.join("real"), root.join("alias1")).unwrap();
    symlink(root.join("real"), root.join("alias2")).unwrap();

    let (outcome, buf) = crawl(CrawlConfig::new(root));

    assert!(outcome.is_clean());
    assert_eq!(buf.records().len(), 1);
    assert_eq!(outcome.stats.duplicates, 2);
}

#[test]
fn test_results_independent_of_concurrency() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    for d in 0..5 {
        let sub = root.join(format!("dir{}", d));
        fs::create_dir(&sub).unwrap();
        for f in 0..10 {
            fs::write(sub.join(format!("file{}.dat", f)), b"x").unwrap();
        }
    }

    let (serial, serial_buf) = crawl(CrawlConfig::new(root).with_concurrency(1));
    let (parallel, parallel_buf) = crawl(CrawlConfig::new(root).with_concurrency(16));

    assert_eq!(serial_buf.paths().len(), 50);
    assert_eq!(serial_buf.paths(), parallel_buf.paths());
    assert_eq!(serial.stats.dirs, parallel.stats.dirs);
    assert_eq!(serial.stats.peak_concurrency, 1);
}

#[test]
fn test_peak_concurrency_within_bound() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    for a in 0..8 {
        for b in 0..8 {
            let leaf = root.join(format!("a{}", a)).join(format!("b{}", b));
            fs::create_dir_all(&leaf).unwrap();
            fs::write(leaf.join("f"), b"").unwrap();
        }
    }

    let (outcome, buf) = crawl(CrawlConfig::new(root).with_concurrency(3));

    assert!(outcome.is_clean());
    assert_eq!(buf.records().len(), 64);
    assert_eq!(outcome.stats.dirs, 1 + 8 + 64);
    assert!(outcome.stats.peak_concurrency >= 1);
    assert!(outcome.stats.peak_concurrency <= 3);
}

#[test]
fn test_error_overflow_is_counted() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    for i in 0..10 {
        symlink(root.join(format!("missing{}", i)), root.join(format!("dangling{}", i))).unwrap();
    }

    let config = CrawlConfig::new(root).with_error_buffer(3);
    let (outcome, _) = crawl(config);

    assert!(outcome.stats.completed);
    assert_eq!(outcome.report.errors().len(), 3);
    assert_eq!(outcome.report.dropped(), 7);
    assert_eq!(outcome.stats.errors, 10);
    assert!(outcome
        .report
        .to_string()
        .contains("7 more error(s) dropped"));
}

#[test]
fn test_root_is_a_file() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("plain");
    fs::write(&file, b"x").unwrap();

    let (outcome, buf) = crawl(CrawlConfig::new(&file));

    assert!(buf.records().is_empty());
    assert_eq!(outcome.report.errors().len(), 1);
    assert!(matches!(
        outcome.report.errors()[0],
        CrawlError::DirectoryRead { .. }
    ));
}
