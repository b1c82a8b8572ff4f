//! Scan dispatcher - capability layer
//!
//! Submits one batch with a single call and assigns every URL either a job
//! id or a terminal failure. A failed submission fails the whole batch.

use crate::clients::ScanService;
use crate::models::{ScanMode, ScanOutcome};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// What the submission gave one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    /// Proceeds to polling
    Job(String),
    /// Terminal; never polled
    Rejected(ScanOutcome),
}

/// Submits batches to the scanning service
pub struct ScanDispatcher {
    service: Arc<dyn ScanService>,
    /// Job ids handed out so far this run
    seen_job_ids: Mutex<HashSet<String>>,
}

impl ScanDispatcher {
    pub fn new(service: Arc<dyn ScanService>) -> Self {
        Self {
            service,
            seen_job_ids: Mutex::new(HashSet::new()),
        }
    }

    /// One submission call for a whole batch
    ///
    /// # Parameters
    /// - `urls`: the batch, in submission order
    /// - `mode`: scan category sent with the request
    ///
    /// # Returns
    /// An assignment per URL, in input order. A failed call rejects every URL
    /// with the same outcome.
    pub async fn dispatch(&self, urls: &[String], mode: ScanMode) -> Vec<(String, Assignment)> {
        let response = match self.service.submit(urls, mode).await {
            Ok(response) => response,
            Err(e) => {
                warn!("→ Scan batch request failed ({} URLs): {}", urls.len(), e);
                let outcome = ScanOutcome::SubmissionFailed(e.to_string());
                return urls
                    .iter()
                    .map(|url| (url.clone(), Assignment::Rejected(outcome.clone())))
                    .collect();
            }
        };

        let jobs: Vec<_> = response.jobs.into_iter().flatten().collect();
        if jobs.is_empty() {
            warn!("→ Scan service returned no jobs for {} URLs", urls.len());
            return urls
                .iter()
                .map(|url| (url.clone(), Assignment::Rejected(ScanOutcome::NoJobReturned)))
                .collect();
        }

        let mut job_ids: HashMap<String, String> = HashMap::new();
        {
            let mut seen = self
                .seen_job_ids
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            for job in jobs {
                let (Some(url), Some(job_id)) = (job.url, job.job_id) else {
                    continue;
                };
                if job_id.is_empty() {
                    continue;
                }
                if !seen.insert(job_id.clone()) {
                    warn!("→ Job id {} was already assigned, ignoring it for {}", job_id, url);
                    continue;
                }
                job_ids.insert(url, job_id);
            }
        }

        info!("✓ Scan service accepted {}/{} URLs", job_ids.len(), urls.len());
        urls.iter()
            .map(|url| {
                let assignment = match job_ids.remove(url) {
                    Some(job_id) => Assignment::Job(job_id),
                    None => Assignment::Rejected(ScanOutcome::NoJobId),
                };
                (url.clone(), assignment)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{PollResponse, SubmitResponse, SubmittedJob};
    use crate::error::ScanError;
    use async_trait::async_trait;

    /// Returns a fixed submission result
    struct FixedSubmit(Option<Vec<Option<SubmittedJob>>>);

    #[async_trait]
    impl ScanService for FixedSubmit {
        async fn submit(&self, _urls: &[String], _mode: ScanMode) -> Result<SubmitResponse, ScanError> {
            match &self.0 {
                Some(jobs) => Ok(SubmitResponse { jobs: jobs.clone() }),
                None => Err(ScanError::BadStatus {
                    endpoint: "/generate/urls".into(),
                    status: 502,
                }),
            }
        }

        async fn poll(&self, _job_id: &str) -> Result<PollResponse, ScanError> {
            unreachable!("dispatcher never polls")
        }
    }

    fn job(url: &str, job_id: Option<&str>) -> Option<SubmittedJob> {
        Some(SubmittedJob {
            url: Some(url.to_string()),
            job_id: job_id.map(str::to_string),
        })
    }

    fn urls() -> Vec<String> {
        vec!["http://x/a.pdf".to_string(), "http://x/b.pdf".to_string()]
    }

    #[tokio::test]
    async fn test_submission_failure_rejects_whole_batch_identically() {
        let dispatcher = ScanDispatcher::new(Arc::new(FixedSubmit(None)));
        let result = dispatcher.dispatch(&urls(), ScanMode::Pdf).await;

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].1, result[1].1);
        match &result[0].1 {
            Assignment::Rejected(ScanOutcome::SubmissionFailed(cause)) => {
                assert!(cause.contains("502"))
            }
            other => panic!("unexpected assignment: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_job_list() {
        let dispatcher = ScanDispatcher::new(Arc::new(FixedSubmit(Some(vec![None]))));
        let result = dispatcher.dispatch(&urls(), ScanMode::Pdf).await;
        assert!(result
            .iter()
            .all(|(_, a)| *a == Assignment::Rejected(ScanOutcome::NoJobReturned)));
    }

    #[tokio::test]
    async fn test_missing_job_id_is_not_polled() {
        let jobs = vec![job("http://x/a.pdf", Some("eq-1")), job("http://x/b.pdf", None)];
        let dispatcher = ScanDispatcher::new(Arc::new(FixedSubmit(Some(jobs))));
        let result = dispatcher.dispatch(&urls(), ScanMode::Pdf).await;

        assert_eq!(result[0], ("http://x/a.pdf".to_string(), Assignment::Job("eq-1".into())));
        assert_eq!(
            result[1],
            ("http://x/b.pdf".to_string(), Assignment::Rejected(ScanOutcome::NoJobId))
        );
    }

    #[tokio::test]
    async fn test_job_ids_are_never_reused() {
        let jobs = vec![job("http://x/a.pdf", Some("eq-1"))];
        let dispatcher = ScanDispatcher::new(Arc::new(FixedSubmit(Some(jobs))));

        let first = dispatcher.dispatch(&urls()[..1], ScanMode::Pdf).await;
        assert_eq!(first[0].1, Assignment::Job("eq-1".into()));

        let second = dispatcher.dispatch(&urls()[..1], ScanMode::Pdf).await;
        assert_eq!(second[0].1, Assignment::Rejected(ScanOutcome::NoJobId));
    }
}
