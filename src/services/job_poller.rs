//! Job poller - capability layer
//!
//! Polls one job at a fixed interval until it reaches a terminal status or
//! its attempt budget runs out. Completed payloads are persisted before the
//! outcome is returned, so a row never points at a file that is not there.

use crate::clients::ScanService;
use crate::config::PollPolicy;
use crate::infrastructure::ResultStore;
use crate::models::{JobStatus, ScanJob, ScanOutcome};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Polls jobs on the scanning service
pub struct JobPoller {
    service: Arc<dyn ScanService>,
    store: ResultStore,
    policy: PollPolicy,
}

impl JobPoller {
    pub fn new(service: Arc<dyn ScanService>, store: ResultStore, policy: PollPolicy) -> Self {
        Self {
            service,
            store,
            policy,
        }
    }

    /// Runs the poll loop for one job. Attempts are strictly sequential and
    /// spaced by the configured interval.
    ///
    /// # Parameters
    /// - `job`: the submitted job; its status is updated as polls come back
    /// - `cancel`: stops polling between or during attempts
    ///
    /// # Returns
    /// The terminal outcome. `Completed` carries the path of a payload that is
    /// already on disk.
    pub async fn poll(&self, job: &mut ScanJob, cancel: &CancellationToken) -> ScanOutcome {
        let max_attempts = self.policy.max_attempts();
        let job_id = job.job_id.clone();

        for attempt in 1..=max_attempts {
            info!(
                "→ Polling job {} for {} (attempt {}/{})",
                job.job_id, job.url, attempt, max_attempts
            );

            let response = tokio::select! {
                _ = cancel.cancelled() => return self.cancelled(job),
                response = self.service.poll(&job_id) => response,
            };

            match response {
                Ok(resp) => {
                    job.status = JobStatus::from_wire(&resp.status, resp.result);
                    match &job.status {
                        JobStatus::Completed(payload) => {
                            return match self.store.persist(&job.job_id, payload).await {
                                Ok(path) => {
                                    info!("✓ Job {} completed, result saved to {}", job.job_id, path.display());
                                    ScanOutcome::Completed(path)
                                }
                                Err(e) => {
                                    warn!("→ Job {} completed but its result could not be saved: {}", job.job_id, e);
                                    ScanOutcome::PersistFailed(e.to_string())
                                }
                            };
                        }
                        JobStatus::Failed => {
                            warn!("→ Job {} failed", job.job_id);
                            return ScanOutcome::Failed;
                        }
                        JobStatus::Error => {
                            warn!("→ Job {} reported an error", job.job_id);
                            return ScanOutcome::Error;
                        }
                        _ => debug!("Job {} still {}", job.job_id, resp.status),
                    }
                }
                Err(e) => warn!("→ Polling error for job {}: {}", job.job_id, e),
            }

            if attempt < max_attempts {
                tokio::select! {
                    _ = cancel.cancelled() => return self.cancelled(job),
                    _ = tokio::time::sleep(self.policy.interval) => {}
                }
            }
        }

        let budget = self.policy.budget_duration();
        warn!("→ Job {} timed out after {:?}", job.job_id, budget);
        job.status = JobStatus::TimedOut;
        ScanOutcome::TimedOut(budget)
    }

    fn cancelled(&self, job: &mut ScanJob) -> ScanOutcome {
        warn!("→ Run cancelled while polling job {}", job.job_id);
        job.status = JobStatus::TimedOut;
        ScanOutcome::Cancelled
    }
}
