//! Remote scan jobs and their terminal outcomes

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value as JsonValue;

/// Submission category; each has its own batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanMode {
    /// PDF validation (`verapdf`)
    Pdf,
    /// Default web page scan
    Html,
}

impl ScanMode {
    /// Value of the `mode` field in the submission body
    pub fn wire_value(&self) -> Option<&'static str> {
        match self {
            ScanMode::Pdf => Some("verapdf"),
            ScanMode::Html => None,
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::Pdf => f.write_str("pdf"),
            ScanMode::Html => f.write_str("html"),
        }
    }
}

/// Poll state of one job
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending,
    Completed(JsonValue),
    Failed,
    Error,
    TimedOut,
}

impl JobStatus {
    /// Maps the `status` string of a poll response
    pub fn from_wire(status: &str, result: Option<JsonValue>) -> Self {
        match status {
            "completed" => JobStatus::Completed(result.unwrap_or(JsonValue::Null)),
            "failed" => JobStatus::Failed,
            "error" => JobStatus::Error,
            _ => JobStatus::Pending,
        }
    }
}

/// One in-flight scan
#[derive(Debug, Clone)]
pub struct ScanJob {
    pub url: String,
    pub job_id: String,
    pub status: JobStatus,
}

impl ScanJob {
    pub fn new(url: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            job_id: job_id.into(),
            status: JobStatus::Pending,
        }
    }
}

/// How a URL's scan ended; reconciled into exactly one output row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Payload persisted at this path
    Completed(PathBuf),
    Failed,
    Error,
    TimedOut(Duration),
    Cancelled,
    /// Completed, but the payload could not be written
    PersistFailed(String),
    SubmissionFailed(String),
    NoJobReturned,
    NoJobId,
    /// Never submitted because the run was cancelled first
    NotSubmitted,
}

impl ScanOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ScanOutcome::Completed(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ScanOutcome::TimedOut(_) | ScanOutcome::Cancelled)
    }
}
