//! Bounded error collection
//!
//! Workers report recoverable errors with a non-blocking send. When the
//! buffer is full the error is counted and dropped, so a flood of failures
//! can never stall traversal. The buffer is drained once, after the crawl.

use crate::error::{CrawlError, CrawlReport};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Counters {
    dropped: AtomicU64,
    warned: AtomicBool,
}

/// Handle for reporting errors
#[derive(Clone)]
pub struct ErrorHandle {
    sender: Sender<CrawlError>,
    counters: Arc<Counters>,
}

impl ErrorHandle {
    /// Record an error without blocking; drops it if the buffer is full
    pub fn report(&self, error: CrawlError) {
        debug!(kind = error.kind_name(), path = %error.path().display(), error = %error, "Traversal error");

        match self.sender.try_send(error) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                if !self.counters.warned.swap(true, Ordering::Relaxed) {
                    warn!("Error buffer full, further errors will be counted but not reported");
                }
            }
        }
    }
}

/// Collects recoverable errors into a [`CrawlReport`]
pub struct ErrorCollector {
    sender: Sender<CrawlError>,
    receiver: Receiver<CrawlError>,
    counters: Arc<Counters>,
}

impl ErrorCollector {
    /// Create a collector holding at most `capacity` errors
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);

        Self {
            sender,
            receiver,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Get a handle for reporting errors
    pub fn handle(&self) -> ErrorHandle {
        ErrorHandle {
            sender: self.sender.clone(),
            counters: Arc::clone(&self.counters),
        }
    }

    /// Drain every buffered error into the aggregated report
    pub fn finish(self) -> CrawlReport {
        drop(self.sender);
        let errors: Vec<CrawlError> = self.receiver.try_iter().collect();
        CrawlReport::new(errors, self.counters.dropped.load(Ordering::Relaxed))
    }
}
