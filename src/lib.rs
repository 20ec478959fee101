//! posix-crawler - Concurrent POSIX Filesystem Crawler
//!
//! Walks a directory tree with a bounded pool of workers, optionally
//! following symbolic links, and emits one JSON line of POSIX metadata for
//! every regular file whose path matches an optional pattern.
//!
//! # Features
//!
//! - **Bounded Parallelism**: at most `concurrency` directories are visited
//!   at once, however wide or deep the tree is.
//!
//! - **Symlink Following**: link chains are resolved hop by hop; cycles,
//!   including links back into an ancestor directory, are reported instead
//!   of looping.
//!
//! - **Partial Failure**: unreadable directories and broken links are
//!   collected into a single report while the rest of the tree is still
//!   crawled.
//!
//! - **Streaming Output**: a dedicated writer thread drains a bounded record
//!   queue, so output starts before the crawl finishes.
//!
//! # Example
//!
//! ```no_run
//! use posix_crawler::{CrawlConfig, CrawlCoordinator};
//!
//! let config = CrawlConfig::new("/data")
//!     .with_pattern(r"\.txt$")
//!     .unwrap()
//!     .with_concurrency(8);
//!
//! let outcome = CrawlCoordinator::new(config).run(std::io::stdout()).unwrap();
//! if !outcome.report.is_empty() {
//!     eprintln!("{}", outcome.report);
//! }
//! ```
//!
//! ```bash
//! posix-crawler /data --pattern '\.txt$' --concurrency 16 > files.jsonl
//! ```

pub mod config;
pub mod error;
pub mod output;
pub mod posix;
pub mod progress;
pub mod walker;

pub use config::{CliArgs, CrawlConfig};
pub use error::{ConfigError, CrawlError, CrawlReport, CrawlerError, Result};
pub use posix::{EntryType, FileRecord, PosixStat};
pub use walker::{CrawlCoordinator, CrawlOutcome, CrawlProgress, CrawlStats};
