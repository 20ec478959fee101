//! Error types for posix-crawler
//!
//! This module defines:
//! - Recoverable traversal errors, collected without halting the crawl
//! - The aggregated report returned once traversal completes
//! - Configuration and fatal runtime errors
//!
//! Library code uses thiserror; the binary wraps these with anyhow context.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level fatal error for a crawl run
#[derive(Error, Debug)]
pub enum CrawlerError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Writing records to the output stream failed
    #[error("Output error: {0}")]
    Output(#[source] io::Error),

}

/// Recoverable traversal error
///
/// Captured at the point of failure and forwarded to the error collector;
/// never aborts sibling tasks or the overall crawl.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// A directory could not be listed
    #[error("Failed to read directory '{}': {source}", path.display())]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A symlink target could not be read or statted
    #[error("Failed to resolve symlink '{}': {source}", path.display())]
    SymlinkResolution {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A symlink chain revisits a path already seen
    #[error("circular symlink: {}", path.display())]
    CircularSymlink { path: PathBuf },

    /// An entry vanished or could not be statted after it was listed
    #[error("Failed to stat '{}': {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CrawlError {
    /// Returns the filesystem path associated with the error
    pub fn path(&self) -> &Path {
        match self {
            CrawlError::DirectoryRead { path, .. }
            | CrawlError::SymlinkResolution { path, .. }
            | CrawlError::CircularSymlink { path }
            | CrawlError::Metadata { path, .. } => path,
        }
    }

    /// Short machine-friendly name for the error class
    pub fn kind_name(&self) -> &'static str {
        match self {
            CrawlError::DirectoryRead { .. } => "directory_read",
            CrawlError::SymlinkResolution { .. } => "symlink_resolution",
            CrawlError::CircularSymlink { .. } => "circular_symlink",
            CrawlError::Metadata { .. } => "metadata",
        }
    }
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No root directory given
    #[error("Root directory is required")]
    MissingRoot,

    /// Pattern is not a valid regular expression
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Concurrency above the supported maximum
    #[error("Invalid concurrency {count}: must be at most {max}")]
    InvalidConcurrency { count: i64, max: usize },

    /// Queue capacity of zero
    #[error("Invalid {name} size {size}: must be at least 1")]
    InvalidBufferSize { name: &'static str, size: usize },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Thread spawn failed
    #[error("Failed to spawn {name} thread: {reason}")]
    SpawnFailed { name: String, reason: String },

    /// Task queue has no receivers left
    #[error("Task queue closed unexpectedly")]
    QueueClosed,
}

/// Result type alias for CrawlerError
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Aggregated report of all recoverable errors from one crawl
///
/// An empty report means the crawl completed cleanly. A non-empty report
/// means partial success: every record that could be produced was emitted.
#[derive(Debug, Default)]
pub struct CrawlReport {
    errors: Vec<CrawlError>,
    dropped: u64,
}

impl CrawlReport {
    /// Build a report from collected errors and the overflow count
    pub fn new(errors: Vec<CrawlError>, dropped: u64) -> Self {
        Self { errors, dropped }
    }

    /// True if no error was recorded or dropped
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.dropped == 0
    }

    /// Collected errors, in arrival order
    pub fn errors(&self) -> &[CrawlError] {
        &self.errors
    }

    /// Errors lost because the error buffer was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Total errors observed, including dropped ones
    pub fn total(&self) -> u64 {
        self.errors.len() as u64 + self.dropped
    }

    /// `Ok(())` for an empty report, otherwise the report itself
    pub fn into_result(self) -> std::result::Result<(), CrawlReport> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
            first = false;
        }
        if self.dropped > 0 {
            if !first {
                writeln!(f)?;
            }
            write!(
                f,
                "{} more error(s) dropped: error buffer full",
                self.dropped
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for CrawlReport {}
