//! Concurrency tokens bounding simultaneous directory visits
//!
//! The pool is a bounded channel pre-filled with `capacity` tokens. Taking a
//! token blocks while the pool is empty; dropping the [`TokenGuard`] puts it
//! back, so release happens on every exit path of a visit.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Usage {
    in_use: AtomicUsize,
    peak: AtomicUsize,
}

/// Fixed-size pool of concurrency tokens
#[derive(Clone)]
pub struct ConcurrencyTokens {
    take: Receiver<()>,
    give: Sender<()>,
    capacity: usize,
    usage: Arc<Usage>,
}

impl ConcurrencyTokens {
    /// Create a pool of `capacity` tokens. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (give, take) = bounded(capacity);
        for _ in 0..capacity {
            // Cannot fail: the channel has room for exactly `capacity` tokens.
            let _ = give.try_send(());
        }

        Self {
            take,
            give,
            capacity,
            usage: Arc::new(Usage::default()),
        }
    }

    /// Take a token, blocking until one is free
    pub fn acquire(&self) -> TokenGuard<'_> {
        // Both ends are owned by the pool, so the channel never disconnects.
        let _ = self.take.recv();

        let now = self.usage.in_use.fetch_add(1, Ordering::SeqCst) + 1;
        self.usage.peak.fetch_max(now, Ordering::SeqCst);

        TokenGuard { pool: self }
    }

    /// Total number of tokens
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tokens currently held
    pub fn in_use(&self) -> usize {
        self.usage.in_use.load(Ordering::SeqCst)
    }

    /// Highest number of tokens ever held at once
    pub fn peak(&self) -> usize {
        self.usage.peak.load(Ordering::SeqCst)
    }

    fn release(&self) {
        self.usage.in_use.fetch_sub(1, Ordering::SeqCst);
        let _ = self.give.try_send(());
    }
}

/// RAII guard for a held token
pub struct TokenGuard<'a> {
    pool: &'a ConcurrencyTokens,
}

impl Drop for TokenGuard<'_> {
    fn drop(&mut self) {
        self.pool.release();
    }
}
