//! Output side of the crawl
//!
//! ```text
//! ┌──────────────────────────────┐
//! │       Worker Threads (N)     │
//! └───────┬──────────────┬───────┘
//!         │ FileRecord   │ CrawlError
//!         ▼              ▼
//! ┌───────────────┐ ┌──────────────────┐
//! │  ResultSink   │ │  ErrorCollector  │
//! │ bounded, sink │ │ bounded, drained │
//! │ thread writes │ │ after the crawl  │
//! │ JSON lines    │ │ overflow dropped │
//! └───────┬───────┘ └────────┬─────────┘
//!         ▼                  ▼
//!      stdout           CrawlReport
//! ```

pub mod collector;
pub mod writer;

pub use collector::{ErrorCollector, ErrorHandle};
pub use writer::{ResultHandle, ResultSink, SinkStats};
