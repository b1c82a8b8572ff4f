//! Result reconciler - capability layer
//!
//! Joins a scan outcome back onto the row that requested it and writes the
//! finished row. Each row is written exactly once.

use crate::error::StoreError;
use crate::infrastructure::OutputSink;
use crate::models::{OutputRecord, ScanOutcome, ScanResult};
use std::sync::Arc;
use tracing::{error, info};

/// Sets the scan column (and a note, for anything but success) from an outcome
pub fn apply_outcome(row: &mut OutputRecord, outcome: &ScanOutcome) {
    let (result, note) = match outcome {
        ScanOutcome::Completed(path) => (ScanResult::Saved(path.clone()), None),
        ScanOutcome::Failed => (ScanResult::Error, Some("Scan failed".to_string())),
        ScanOutcome::Error => (ScanResult::Error, Some("Scan error".to_string())),
        ScanOutcome::TimedOut(budget) => (
            ScanResult::TimedOut,
            Some(format!("Scan timed out after {}s", budget.as_secs())),
        ),
        ScanOutcome::Cancelled => (
            ScanResult::TimedOut,
            Some("Scan timed out: run cancelled".to_string()),
        ),
        ScanOutcome::PersistFailed(cause) => (
            ScanResult::Error,
            Some(format!("Failed to save scan result: {}", cause)),
        ),
        ScanOutcome::SubmissionFailed(cause) => (
            ScanResult::Error,
            Some(format!("Error during scan request: {}", cause)),
        ),
        ScanOutcome::NoJobReturned => (ScanResult::Error, Some("No job returned from scan".to_string())),
        ScanOutcome::NoJobId => (ScanResult::Error, Some("No jobId found".to_string())),
        ScanOutcome::NotSubmitted => (
            ScanResult::Skipped,
            Some("Scan skipped: run cancelled".to_string()),
        ),
    };

    row.scan_result = result;
    if let Some(note) = note {
        row.push_note(note);
    }
}

/// Writes rows whose scans have finished
#[derive(Clone)]
pub struct ResultReconciler {
    sink: Arc<OutputSink>,
}

impl ResultReconciler {
    pub fn new(sink: Arc<OutputSink>) -> Self {
        Self { sink }
    }

    /// Applies the outcome and emits the row.
    ///
    /// # Parameters
    /// - `row`: the row mapped to the scanned URL
    /// - `outcome`: how that URL's scan ended
    ///
    /// # Returns
    /// `true` if the row was written; `false` if it had been written already
    pub async fn reconcile(&self, mut row: OutputRecord, outcome: &ScanOutcome) -> Result<bool, StoreError> {
        apply_outcome(&mut row, outcome);
        if outcome.is_success() {
            info!("[row {}] ✓ scan result recorded", row.index + 1);
        } else {
            info!("[row {}] → scan finished without result: {}", row.index + 1, row.notes_text());
        }
        self.emit(&row).await
    }

    /// Emits a row that needs no scan
    pub async fn emit(&self, row: &OutputRecord) -> Result<bool, StoreError> {
        let written = self.sink.write(row).await?;
        if !written {
            error!("[row {}] reconciled twice; second result dropped", row.index + 1);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InputRecord, LinkType};
    use std::path::PathBuf;
    use std::time::Duration;

    fn row() -> OutputRecord {
        OutputRecord::pass_through(&InputRecord::with_link(0, LinkType::Pdf, "http://x/a.pdf"))
    }

    #[test]
    fn test_completed_sets_path_without_note() {
        let mut r = row();
        apply_outcome(&mut r, &ScanOutcome::Completed(PathBuf::from("results/job_1.json")));
        assert_eq!(r.scan_result.to_string(), "results/job_1.json");
        assert!(r.notes.is_empty());
    }

    #[test]
    fn test_failure_notes() {
        let cases = [
            (ScanOutcome::Failed, "error", "Scan failed"),
            (ScanOutcome::Error, "error", "Scan error"),
            (ScanOutcome::TimedOut(Duration::from_secs(180)), "timed out", "Scan timed out after 180s"),
            (ScanOutcome::Cancelled, "timed out", "Scan timed out: run cancelled"),
            (ScanOutcome::NoJobReturned, "error", "No job returned from scan"),
            (ScanOutcome::NoJobId, "error", "No jobId found"),
            (ScanOutcome::NotSubmitted, "skipped", "Scan skipped: run cancelled"),
            (
                ScanOutcome::PersistFailed("disk full".into()),
                "error",
                "Failed to save scan result: disk full",
            ),
            (
                ScanOutcome::SubmissionFailed("HTTP 502".into()),
                "error",
                "Error during scan request: HTTP 502",
            ),
        ];

        for (outcome, cell, note) in cases {
            let mut r = row();
            apply_outcome(&mut r, &outcome);
            assert_eq!(r.scan_result.to_string(), cell, "{:?}", outcome);
            assert_eq!(r.notes_text(), note);
        }
    }

    #[test]
    fn test_outcome_note_follows_existing_notes() {
        let mut r = row();
        r.push_note("Only remote scan required");
        apply_outcome(&mut r, &ScanOutcome::Failed);
        assert_eq!(r.notes_text(), "Only remote scan required; Scan failed");
    }

    #[tokio::test]
    async fn test_row_is_written_once() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.csv");
        let sink = Arc::new(OutputSink::create(&path, &[]).unwrap());
        let reconciler = ResultReconciler::new(sink.clone());

        assert!(reconciler.reconcile(row(), &ScanOutcome::Failed).await.unwrap());
        assert!(!reconciler.reconcile(row(), &ScanOutcome::Error).await.unwrap());
        assert_eq!(sink.written().await, 1);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Scan failed"));
        assert!(!content.contains("Scan error"));
    }
}
