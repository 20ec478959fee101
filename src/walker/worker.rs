//! Worker thread logic for parallel directory visits
//!
//! Each worker:
//! - Pulls directory tasks from the task queue
//! - Takes a concurrency token for the duration of the visit
//! - Sends matched records to the result sink and errors to the collector
//! - Schedules discovered subdirectories back onto the queue
//!
//! The token is released before the task is marked complete, and both
//! happen on every exit path, including a panicking visit.

use crate::error::{CrawlError, WorkerError};
use crate::output::{ErrorHandle, ResultHandle};
use crate::posix::FileRecord;
use crate::walker::queue::{DirTask, TaskReceiver, TaskSender};
use crate::walker::tokens::ConcurrencyTokens;
use crate::walker::visitor::{DirStats, DirectoryVisitor, VisitSink};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace};

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Directories listed
    pub dirs_visited: AtomicU64,

    /// Files emitted
    pub files_matched: AtomicU64,

    /// Bytes emitted (sum of file sizes)
    pub bytes_matched: AtomicU64,

    /// Symlinks followed
    pub symlinks_followed: AtomicU64,

    /// Errors encountered
    pub errors: AtomicU64,

    /// Tasks dropped without a visit (shutdown)
    pub skipped: AtomicU64,
}

impl WorkerStats {
    fn record_visit(&self, dir: &DirStats) {
        self.dirs_visited.fetch_add(1, Ordering::Relaxed);
        self.files_matched.fetch_add(dir.files, Ordering::Relaxed);
        self.bytes_matched.fetch_add(dir.bytes, Ordering::Relaxed);
        self.symlinks_followed.fetch_add(dir.symlinks, Ordering::Relaxed);
        self.errors.fetch_add(dir.errors, Ordering::Relaxed);
    }

    fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }
}

/// Everything a worker shares with the rest of the crawl
#[derive(Clone)]
pub struct WorkerContext {
    pub visitor: Arc<DirectoryVisitor>,
    pub tokens: ConcurrencyTokens,
    pub tasks_rx: TaskReceiver,
    pub tasks_tx: TaskSender,
    pub results: ResultHandle,
    pub errors: ErrorHandle,
    pub shutdown: Arc<AtomicBool>,
}

/// A worker thread that processes directory tasks
pub struct Worker {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<()>>,

    /// Worker statistics
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a new worker thread
    pub fn spawn(id: usize, ctx: WorkerContext) -> Result<Self, WorkerError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("crawler-{}", id))
            .spawn(move || worker_loop(id, ctx, stats_clone))
            .map_err(|e| WorkerError::SpawnFailed {
                name: format!("crawler-{}", id),
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| WorkerError::Panicked {
                id: self.id,
                message: "Worker thread panicked".into(),
            }),
            None => Ok(()),
        }
    }
}

/// Marks a task complete when dropped
struct Completion<'a> {
    tasks: &'a TaskSender,
}

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        self.tasks.complete();
    }
}

/// Routes visit results into the shared channels
struct ChannelSink<'a> {
    ctx: &'a WorkerContext,
    sink_closed: bool,
}

impl VisitSink for ChannelSink<'_> {
    fn schedule(&mut self, task: DirTask) {
        if self.ctx.tasks_tx.schedule(task).is_err() {
            debug!("Task queue closed, dropping subdirectory");
        }
    }

    fn emit(&mut self, record: FileRecord) {
        if self.ctx.results.send(record).is_err() && !self.sink_closed {
            self.sink_closed = true;
            debug!("Result sink closed, records are being discarded");
        }
    }

    fn report(&mut self, error: CrawlError) {
        self.ctx.errors.report(error);
    }
}

/// Main worker loop
fn worker_loop(id: usize, ctx: WorkerContext, stats: Arc<WorkerStats>) {
    debug!(worker = id, "Worker starting");

    while let Some(task) = ctx.tasks_rx.recv() {
        let _done = Completion {
            tasks: &ctx.tasks_tx,
        };

        if ctx.shutdown.load(Ordering::Relaxed) {
            stats.record_skip();
            continue;
        }

        let _token = ctx.tokens.acquire();
        if ctx.shutdown.load(Ordering::Relaxed) {
            stats.record_skip();
            continue;
        }

        let mut sink = ChannelSink {
            ctx: &ctx,
            sink_closed: false,
        };

        match ctx.visitor.visit(&task, &mut sink) {
            Ok(dir) => {
                trace!(worker = id, path = %task.path.display(), entries = dir.entries, subdirs = dir.dirs, "Directory visited");
                stats.record_visit(&dir);
            }
            Err(error) => {
                stats.record_error();
                ctx.errors.report(error);
            }
        }
    }

    debug!(
        worker = id,
        dirs = stats.dirs_visited.load(Ordering::Relaxed),
        files = stats.files_matched.load(Ordering::Relaxed),
        "Worker shutting down"
    );
}

/// Totals across all workers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerTotals {
    pub dirs: u64,
    pub files: u64,
    pub bytes: u64,
    pub symlinks: u64,
    pub errors: u64,
    pub skipped: u64,
}

/// Aggregate statistics from multiple workers
pub fn aggregate_stats(workers: &[Worker]) -> WorkerTotals {
    let mut totals = WorkerTotals::default();

    for worker in workers {
        let s = &worker.stats;
        totals.dirs += s.dirs_visited.load(Ordering::Relaxed);
        totals.files += s.files_matched.load(Ordering::Relaxed);
        totals.bytes += s.bytes_matched.load(Ordering::Relaxed);
        totals.symlinks += s.symlinks_followed.load(Ordering::Relaxed);
        totals.errors += s.errors.load(Ordering::Relaxed);
        totals.skipped += s.skipped.load(Ordering::Relaxed);
    }

    totals
}
