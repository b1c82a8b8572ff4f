//! # pdf_a11y_scan
//!
//! Accessibility analysis of document links listed in a spreadsheet: local
//! PDF properties (size, pages, text, tags) plus batched remote scans
//! against an asynchronous scanning service.
//!
//! ## Architecture
//!
//! Four layers, each depending only on the ones below it:
//!
//! ### ① Infrastructure
//! - `infrastructure/` - durable resources, write-only capabilities
//! - `OutputSink` - the single writer of the output sheet
//! - `ResultStore` - one JSON file per completed scan job
//!
//! ### ② Services (capabilities)
//! - `services/` - what can be done for one row or one batch
//! - `RowClassifier` - which checks a row still owes
//! - `LopdfExtractor` - local PDF properties
//! - `BatchAccumulators` - bounded batches per scan mode
//! - `ScanDispatcher` / `JobPoller` - submission and polling
//! - `ResultReconciler` - outcome → output row
//!
//! ### ③ Workflow
//! - `workflow/` - the complete handling of one input row
//! - `RowCtx` - log context
//! - `RowFlow` - classify → retrieve → extract → maybe enqueue
//!
//! ### ④ Orchestration
//! - `orchestrator/batch_processor` - run lifecycle, row loop, statistics
//! - `orchestrator/scan_batch` - submission, polling and reconciliation of one batch
//!
//! `clients/` (scan service, document retrieval) and `models/` are shared
//! by all layers.

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use orchestrator::{App, Pipeline};
pub use services::ReportSummary;
pub use utils::logging::RunSummary;
