//! Scan batch processor - orchestration layer
//!
//! ## Responsibilities
//!
//! Takes one closed batch from submission to written rows:
//!
//! 1. **Submission**: one dispatcher call for the whole batch
//! 2. **Polling**: one task per accepted job, bounded by a shared semaphore
//! 3. **Reconciliation**: every row of the batch is written exactly once,
//!    whatever happened to its scan
//!
//! A batch that reaches this stage after cancellation is never submitted;
//! its rows are written as skipped.

use crate::models::{OutputRecord, ScanJob, ScanOutcome};
use crate::services::{Assignment, JobPoller, ResultReconciler, ScanBatch, ScanDispatcher};
use crate::utils::logging::{log_batch_complete, log_batch_start};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Per-batch counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub completed: usize,
    pub failed: usize,
    pub timed_out: usize,
    /// Cancelled while polling or never submitted
    pub cancelled: usize,
}

impl BatchResult {
    fn record(&mut self, outcome: &ScanOutcome) {
        match outcome {
            ScanOutcome::Completed(_) => self.completed += 1,
            ScanOutcome::TimedOut(_) => self.timed_out += 1,
            ScanOutcome::Cancelled | ScanOutcome::NotSubmitted => self.cancelled += 1,
            _ => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.completed + self.failed + self.timed_out + self.cancelled
    }
}

/// Everything a batch task needs; cheap to clone into `tokio::spawn`
#[derive(Clone)]
pub struct ScanStage {
    pub dispatcher: Arc<ScanDispatcher>,
    pub poller: Arc<JobPoller>,
    pub reconciler: ResultReconciler,
    pub semaphore: Arc<Semaphore>,
    pub cancel: CancellationToken,
}

impl ScanStage {
    /// Submits, polls and reconciles one batch
    ///
    /// # Parameters
    /// - `batch_num`: batch number, for logging only
    /// - `batch`: the closed batch; its rows move into this call
    pub async fn process(&self, batch_num: usize, batch: ScanBatch) -> BatchResult {
        let ScanBatch { mode, urls, mut rows } = batch;
        let mut result = BatchResult::default();
        log_batch_start(batch_num, &mode.to_string(), urls.len());

        if self.cancel.is_cancelled() {
            warn!("→ Run cancelled, scan batch #{} will not be submitted", batch_num);
            for url in &urls {
                if let Some(row) = rows.remove(url) {
                    self.reconcile(row, &ScanOutcome::NotSubmitted).await;
                    result.record(&ScanOutcome::NotSubmitted);
                }
            }
            log_batch_complete(batch_num, result.completed, result.total());
            return result;
        }

        let assignments = self.dispatcher.dispatch(&urls, mode).await;

        let mut handles = Vec::new();
        // Copies of rows handed to poll tasks, written if a task dies
        let mut fallbacks = Vec::new();
        for (url, assignment) in assignments {
            let Some(row) = rows.remove(&url) else {
                error!("→ No row mapped to {} in scan batch #{}", url, batch_num);
                continue;
            };

            match assignment {
                Assignment::Rejected(outcome) => {
                    self.reconcile(row, &outcome).await;
                    result.record(&outcome);
                }
                Assignment::Job(job_id) => {
                    let permit = match self.semaphore.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            error!("→ Poll semaphore closed: {}", e);
                            self.reconcile(row, &ScanOutcome::Cancelled).await;
                            result.record(&ScanOutcome::Cancelled);
                            continue;
                        }
                    };
                    fallbacks.push(row.clone());
                    let stage = self.clone();
                    let handle = tokio::spawn(async move {
                        let _permit = permit;
                        let mut job = ScanJob::new(url, job_id);
                        let outcome = stage.poller.poll(&mut job, &stage.cancel).await;
                        stage.reconcile(row, &outcome).await;
                        outcome
                    });
                    handles.push(handle);
                }
            }
        }

        for (joined, fallback) in join_all(handles).await.into_iter().zip(fallbacks) {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("→ Poll task in scan batch #{} failed: {}", batch_num, e);
                    // The sink ignores this if the task got as far as writing
                    self.reconcile(fallback, &ScanOutcome::Error).await;
                    ScanOutcome::Error
                }
            };
            result.record(&outcome);
        }

        log_batch_complete(batch_num, result.completed, result.total());
        result
    }

    async fn reconcile(&self, row: OutputRecord, outcome: &ScanOutcome) {
        let index = row.index;
        if let Err(e) = self.reconciler.reconcile(row, outcome).await {
            error!("[row {}] ❌ failed to write output row: {}", index + 1, e);
        }
    }
}
