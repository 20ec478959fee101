//! Task queue with outstanding-task accounting
//!
//! Directory tasks travel over an unbounded channel: a worker holding a
//! concurrency token must never block while scheduling the subdirectories it
//! discovers, or a small token pool could deadlock on itself.
//!
//! Completion is tracked by an outstanding-task counter. A task is counted
//! before it is sent and uncounted after its visit finishes, so the counter
//! only reaches zero once no task is queued or running. The sender whose
//! decrement reaches zero stops every worker and signals the coordinator.

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A task to visit a directory
#[derive(Debug, Clone)]
pub struct DirTask {
    /// Path of the directory as reached by the crawl
    pub path: PathBuf,

    /// Depth from root (0 = root)
    pub depth: u32,

    /// Real path of the directory, tracked only when symlinks are followed
    pub canonical: Option<PathBuf>,
}

impl DirTask {
    /// Create the root task
    pub fn root(path: PathBuf, canonical: Option<PathBuf>) -> Self {
        Self {
            path,
            depth: 0,
            canonical,
        }
    }

    /// Create a task for a subdirectory of this one
    pub fn child(&self, path: PathBuf, canonical: Option<PathBuf>) -> Self {
        Self {
            path,
            depth: self.depth + 1,
            canonical,
        }
    }
}

#[derive(Debug)]
enum Message {
    Visit(DirTask),
    Stop,
}

/// Task queue shared by all workers
pub struct TaskQueue {
    sender: Sender<Message>,
    receiver: Receiver<Message>,
    pending: Arc<AtomicUsize>,
    workers: usize,
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
}

impl TaskQueue {
    /// Create a queue served by `workers` worker threads
    pub fn new(workers: usize) -> Self {
        let (sender, receiver) = unbounded();
        let (done_tx, done_rx) = bounded(1);

        Self {
            sender,
            receiver,
            pending: Arc::new(AtomicUsize::new(0)),
            workers: workers.max(1),
            done_tx,
            done_rx,
        }
    }

    /// Get a sender handle (clone for each worker)
    pub fn sender(&self) -> TaskSender {
        TaskSender {
            sender: self.sender.clone(),
            pending: Arc::clone(&self.pending),
            workers: self.workers,
            done_tx: self.done_tx.clone(),
        }
    }

    /// Get a receiver handle (clone for each worker)
    pub fn receiver(&self) -> TaskReceiver {
        TaskReceiver {
            receiver: self.receiver.clone(),
        }
    }

    /// Seed the queue with the root task
    pub fn seed(&self, task: DirTask) -> Result<(), ()> {
        self.sender().schedule(task)
    }

    /// Outstanding tasks (queued or running)
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Check if all work is complete
    pub fn is_complete(&self) -> bool {
        self.pending() == 0
    }

    /// Wait up to `timeout` for the outstanding count to reach zero
    pub fn wait_complete(&self, timeout: Duration) -> bool {
        if self.is_complete() {
            return true;
        }
        match self.done_rx.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) => self.is_complete(),
            Err(RecvTimeoutError::Disconnected) => self.is_complete(),
        }
    }
}

/// Handle for scheduling and completing tasks
#[derive(Clone)]
pub struct TaskSender {
    sender: Sender<Message>,
    pending: Arc<AtomicUsize>,
    workers: usize,
    done_tx: Sender<()>,
}

impl TaskSender {
    /// Count and enqueue a task. Never blocks.
    ///
    /// Returns `Err` only if every receiver is gone.
    pub fn schedule(&self, task: DirTask) -> Result<(), ()> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(Message::Visit(task)).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(());
        }
        Ok(())
    }

    /// Mark one task finished. The last one stops all workers.
    pub fn complete(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            for _ in 0..self.workers {
                let _ = self.sender.send(Message::Stop);
            }
            let _ = self.done_tx.try_send(());
        }
    }
}

/// Handle for receiving tasks
#[derive(Clone)]
pub struct TaskReceiver {
    receiver: Receiver<Message>,
}

impl TaskReceiver {
    /// Block until a task arrives. `None` means the crawl is over.
    pub fn recv(&self) -> Option<DirTask> {
        match self.receiver.recv() {
            Ok(Message::Visit(task)) => Some(task),
            Ok(Message::Stop) | Err(_) => None,
        }
    }
}
