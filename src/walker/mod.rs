//! Parallel directory crawler
//!
//! # Architecture
//!
//! ```text
//!                     ┌─────────────────────────┐
//!                     │    CrawlCoordinator     │
//!                     │  - seeds root task      │
//!                     │  - waits for pending=0  │
//!                     └───────────┬─────────────┘
//!                                 │ TaskQueue (unbounded, counted)
//!       ┌─────────────────────────┼─────────────────────────┐
//!       │                         │                         │
//! ┌─────▼─────┐             ┌─────▼─────┐             ┌─────▼─────┐
//! │  Worker 1 │             │  Worker 2 │             │  Worker N │
//! │  token ►  │             │  token ►  │             │  token ►  │
//! │  visit    │             │  visit    │             │  visit    │
//! └───────────┘             └───────────┘             └───────────┘
//!    │ subdirs back to the queue, records to the sink, errors to the collector
//! ```

pub mod coordinator;
pub mod filter;
pub mod queue;
pub mod symlink;
pub mod tokens;
pub mod visitor;
pub mod worker;

pub use coordinator::{CrawlCoordinator, CrawlOutcome, CrawlProgress, CrawlStats};
pub use filter::PatternFilter;
pub use queue::{DirTask, TaskQueue};
pub use symlink::{Resolved, SymlinkResolver};
pub use tokens::ConcurrencyTokens;
pub use visitor::{DirStats, DirectoryVisitor, VisitSink};
