//! Infrastructure layer
//!
//! Holds the durable resources of a run and only exposes write capabilities.

pub mod output_sink;
pub mod result_store;

pub use output_sink::OutputSink;
pub use result_store::ResultStore;
