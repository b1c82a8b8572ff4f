//! Orchestration layer
//!
//! ## Responsibilities
//!
//! Runs the whole analysis and schedules work. This layer holds every
//! resource and all run-wide statistics, and contains no per-row decisions.
//!
//! ## Modules
//!
//! ### `batch_processor` - run lifecycle
//! - builds the clients (`App::initialize`)
//! - reset / resume of the output sheet
//! - the sequential row loop and batch accumulation
//! - cancellation (Ctrl-C, run deadline)
//! - final statistics
//!
//! ### `scan_batch` - one scan batch
//! - one submission per batch
//! - one poll task per job, bounded by a semaphore (`max_concurrent_polls`)
//! - writes every row of the batch exactly once
//!
//! ## Layering
//!
//! ```text
//! batch_processor (Vec<InputRecord>)
//!     ↓
//! workflow::RowFlow (one InputRecord)      scan_batch (one ScanBatch)
//!     ↓                                        ↓
//! services (classifier / extractor / accumulator / dispatcher / poller / reconciler)
//!     ↓
//! infrastructure (OutputSink, ResultStore) + clients (ScanClient, LinkFetcher)
//! ```

pub mod batch_processor;
pub mod scan_batch;

pub use batch_processor::{App, Pipeline};
pub use scan_batch::{BatchResult, ScanStage};
