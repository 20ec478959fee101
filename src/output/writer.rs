//! JSON-lines result sink
//!
//! Records arrive over a bounded channel and are written by a dedicated
//! thread, one JSON object per line. Producers block when the channel is
//! full. The writer is flushed whenever the channel runs dry, and the thread
//! only exits once every sender is gone and the channel is drained.

use crate::error::{CrawlerError, WorkerError};
use crate::posix::FileRecord;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use std::collections::HashSet;
use std::io::{self, BufWriter, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::debug;

/// Statistics about written records
#[derive(Debug, Default)]
pub struct SinkStats {
    /// Records written to the output
    pub records_written: AtomicU64,

    /// Records suppressed because their path was already written
    pub duplicates: AtomicU64,
}

impl SinkStats {
    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates.load(Ordering::Relaxed)
    }
}

/// Handle for sending records to the sink
#[derive(Clone)]
pub struct ResultHandle {
    sender: Sender<FileRecord>,
}

impl ResultHandle {
    /// Send a record, blocking while the queue is full.
    ///
    /// Returns `Err` if the sink thread has stopped.
    pub fn send(&self, record: FileRecord) -> Result<(), ()> {
        self.sender.send(record).map_err(|_| ())
    }
}

/// Sink thread writing records to an output stream
pub struct ResultSink {
    handle: Option<JoinHandle<io::Result<()>>>,
    sender: ResultHandle,
    stats: Arc<SinkStats>,
}

impl ResultSink {
    /// Spawn the sink thread.
    ///
    /// With `dedup` set, a record whose path was already written is dropped;
    /// this keeps output unique when links lead to the same file twice.
    pub fn spawn<W>(writer: W, capacity: usize, dedup: bool) -> Result<Self, WorkerError>
    where
        W: Write + Send + 'static,
    {
        let (sender, receiver) = bounded(capacity.max(1));
        let stats = Arc::new(SinkStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name("result-sink".into())
            .spawn(move || sink_loop(writer, receiver, stats_clone, dedup))
            .map_err(|e| WorkerError::SpawnFailed {
                name: "result-sink".into(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            handle: Some(handle),
            sender: ResultHandle { sender },
            stats,
        })
    }

    /// Get a handle for sending records
    pub fn handle(&self) -> ResultHandle {
        self.sender.clone()
    }

    /// Close the sink and wait until every queued record is written.
    ///
    /// All other handles must already be dropped, or this waits for them.
    pub fn finish(self) -> Result<Arc<SinkStats>, CrawlerError> {
        let ResultSink { handle, sender, stats } = self;
        drop(sender);

        if let Some(handle) = handle {
            match handle.join() {
                Ok(result) => result.map_err(CrawlerError::Output)?,
                Err(_) => {
                    return Err(CrawlerError::Worker(WorkerError::Panicked {
                        id: 0,
                        message: "result sink thread panicked".into(),
                    }))
                }
            }
        }

        Ok(stats)
    }
}

fn sink_loop<W: Write>(
    writer: W,
    receiver: Receiver<FileRecord>,
    stats: Arc<SinkStats>,
    dedup: bool,
) -> io::Result<()> {
    let mut out = BufWriter::new(writer);
    let mut seen: Option<HashSet<String>> = dedup.then(HashSet::new);

    loop {
        let record = match receiver.try_recv() {
            Ok(record) => record,
            Err(TryRecvError::Empty) => {
                out.flush()?;
                match receiver.recv() {
                    Ok(record) => record,
                    Err(_) => break,
                }
            }
            Err(TryRecvError::Disconnected) => break,
        };

        if let Some(seen) = seen.as_mut() {
            if !seen.insert(record.path.clone()) {
                stats.duplicates.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        }

        serde_json::to_writer(&mut out, &record)?;
        out.write_all(b"\n")?;
        stats.records_written.fetch_add(1, Ordering::Relaxed);
    }

    out.flush()?;
    debug!(records = stats.records_written(), "Result sink drained");
    Ok(())
}
