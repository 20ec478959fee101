//! Crawl coordinator - orchestrates the parallel traversal
//!
//! The coordinator is responsible for:
//! - Setting up the token pool, task queue, result sink and error collector
//! - Seeding the root task and spawning workers
//! - Waiting for the outstanding-task count to reach zero
//! - Progress reporting and graceful shutdown
//! - Final statistics and the aggregated error report

use crate::config::CrawlConfig;
use crate::error::{CrawlReport, CrawlerError, Result, WorkerError};
use crate::output::{ErrorCollector, ResultSink};
use crate::walker::queue::TaskQueue;
use crate::walker::tokens::ConcurrencyTokens;
use crate::walker::visitor::DirectoryVisitor;
use crate::walker::worker::{aggregate_stats, Worker, WorkerContext};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How often the coordinator wakes up to report progress
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Statistics of a finished crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlStats {
    /// Directories listed
    pub dirs: u64,

    /// Files matched
    pub files: u64,

    /// Total size of matched files
    pub bytes: u64,

    /// Symlinks followed
    pub symlinks: u64,

    /// Records written to the output
    pub records_written: u64,

    /// Records suppressed as duplicates
    pub duplicates: u64,

    /// Recoverable errors, including dropped ones
    pub errors: u64,

    /// Tasks dropped without a visit after an interrupt
    pub skipped: u64,

    /// Most directories ever visited at once
    pub peak_concurrency: usize,

    /// Time taken for the crawl
    pub duration: Duration,

    /// Whether the crawl completed (vs was interrupted)
    pub completed: bool,
}

/// Statistics plus the aggregated error report
#[derive(Debug)]
pub struct CrawlOutcome {
    pub stats: CrawlStats,
    pub report: CrawlReport,
}

impl CrawlOutcome {
    /// True if the crawl finished without any recoverable error
    pub fn is_clean(&self) -> bool {
        self.stats.completed && self.report.is_empty()
    }

    /// Split into statistics on success, or the report on partial success
    pub fn into_result(self) -> std::result::Result<CrawlStats, CrawlReport> {
        let CrawlOutcome { stats, report } = self;
        report.into_result().map(|()| stats)
    }
}

/// Progress information for display
#[derive(Debug, Clone)]
pub struct CrawlProgress {
    /// Directories listed
    pub dirs: u64,

    /// Files matched
    pub files: u64,

    /// Bytes matched
    pub bytes: u64,

    /// Errors encountered
    pub errors: u64,

    /// Outstanding tasks
    pub pending: usize,

    /// Directories being visited right now
    pub active: usize,

    /// Concurrency bound
    pub concurrency: usize,

    /// Elapsed time
    pub elapsed: Duration,
}

impl CrawlProgress {
    /// Calculate files per second rate
    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.files as f64 / secs
        } else {
            0.0
        }
    }

    /// Calculate dirs per second rate
    pub fn dirs_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.dirs as f64 / secs
        } else {
            0.0
        }
    }
}

/// Coordinates the parallel crawl
pub struct CrawlCoordinator {
    /// Configuration
    config: Arc<CrawlConfig>,

    /// Shutdown signal
    shutdown: Arc<AtomicBool>,
}

impl CrawlCoordinator {
    /// Create a new crawl coordinator
    pub fn new(config: CrawlConfig) -> Self {
        Self {
            config: Arc::new(config),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a clone of the shutdown flag (for signal handlers)
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Crawl the configured root, writing JSON lines to `output`
    pub fn run<W>(&self, output: W) -> Result<CrawlOutcome>
    where
        W: Write + Send + 'static,
    {
        self.run_with_progress(output, |_| {})
    }

    /// Crawl, calling `on_progress` periodically until traversal completes
    pub fn run_with_progress<W, F>(&self, output: W, mut on_progress: F) -> Result<CrawlOutcome>
    where
        W: Write + Send + 'static,
        F: FnMut(&CrawlProgress),
    {
        let start = Instant::now();
        let config = &self.config;

        info!(
            root = %config.root.display(),
            concurrency = config.concurrency,
            follow_symlinks = config.follow_symlinks,
            pattern = config.filter.as_str().unwrap_or(""),
            "Starting crawl"
        );

        // Deduplicate output paths only when links can lead to a file twice
        let sink = ResultSink::spawn(output, config.result_buffer, config.follow_symlinks)?;
        let collector = ErrorCollector::new(config.error_buffer);
        let tokens = ConcurrencyTokens::new(config.concurrency);
        let queue = TaskQueue::new(config.concurrency);

        let visitor = Arc::new(DirectoryVisitor::new(
            config.filter.clone(),
            config.follow_symlinks,
        ));

        // The root counts as outstanding before any worker exists
        queue
            .seed(visitor.root_task(config.root.clone()))
            .map_err(|_| WorkerError::QueueClosed)?;

        let ctx = WorkerContext {
            visitor,
            tokens: tokens.clone(),
            tasks_rx: queue.receiver(),
            tasks_tx: queue.sender(),
            results: sink.handle(),
            errors: collector.handle(),
            shutdown: Arc::clone(&self.shutdown),
        };

        let workers = self.spawn_workers(&ctx)?;
        drop(ctx);

        // Wait for the outstanding-task count to drain
        while !queue.wait_complete(PROGRESS_INTERVAL) {
            let totals = aggregate_stats(&workers);
            on_progress(&CrawlProgress {
                dirs: totals.dirs,
                files: totals.files,
                bytes: totals.bytes,
                errors: totals.errors,
                pending: queue.pending(),
                active: tokens.in_use(),
                concurrency: tokens.capacity(),
                elapsed: start.elapsed(),
            });
        }

        let totals = aggregate_stats(&workers);
        for worker in workers {
            let id = worker.id();
            if let Err(e) = worker.join() {
                warn!(worker = id, error = %e, "Worker failed to join cleanly");
            }
        }

        let sink_stats = sink.finish()?;
        let report = collector.finish();
        let completed = !self.shutdown.load(Ordering::SeqCst);

        let stats = CrawlStats {
            dirs: totals.dirs,
            files: totals.files,
            bytes: totals.bytes,
            symlinks: totals.symlinks,
            records_written: sink_stats.records_written(),
            duplicates: sink_stats.duplicates(),
            errors: report.total(),
            skipped: totals.skipped,
            peak_concurrency: tokens.peak(),
            duration: start.elapsed(),
            completed,
        };

        if !completed {
            info!(skipped = stats.skipped, "Crawl was interrupted before completion");
        }

        info!(
            dirs = stats.dirs,
            files = stats.files,
            records = stats.records_written,
            errors = stats.errors,
            duration_ms = stats.duration.as_millis() as u64,
            "Crawl completed"
        );

        Ok(CrawlOutcome { stats, report })
    }

    /// Spawn one worker per concurrency token
    fn spawn_workers(&self, ctx: &WorkerContext) -> Result<Vec<Worker>> {
        let mut workers = Vec::with_capacity(self.config.concurrency);

        for id in 0..self.config.concurrency {
            match Worker::spawn(id, ctx.clone()) {
                Ok(worker) => workers.push(worker),
                Err(e) if workers.is_empty() => {
                    self.shutdown.store(true, Ordering::SeqCst);
                    return Err(CrawlerError::Worker(e));
                }
                Err(e) => {
                    warn!(error = %e, spawned = workers.len(), "Continuing with fewer workers");
                    break;
                }
            }
        }

        debug!(count = workers.len(), "Workers spawned");
        Ok(workers)
    }
}
