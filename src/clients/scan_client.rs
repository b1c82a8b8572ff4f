/// Remote scanning service client
///
/// Wraps the two endpoints the pipeline needs: batch submission and per-job
/// result polling.
use crate::config::Config;
use crate::error::ScanError;
use crate::models::ScanMode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::debug;

/// One URL in a submission body
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubmitUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<Vec<String>>,
}

/// Submission body: `{urls: [{url, flags?}], mode?}`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubmitRequest {
    pub urls: Vec<SubmitUrl>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl SubmitRequest {
    pub fn new(urls: &[String], mode: ScanMode) -> Self {
        Self {
            urls: urls
                .iter()
                .map(|url| SubmitUrl {
                    url: url.clone(),
                    flags: None,
                })
                .collect(),
            mode: mode.wire_value().map(str::to_string),
        }
    }
}

/// One entry of the `jobs` array; either field may be missing
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct SubmittedJob {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "jobId")]
    pub job_id: Option<String>,
}

/// Submission response: `{jobs: [{url, jobId}]}`
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct SubmitResponse {
    /// Null entries are tolerated and dropped by the dispatcher
    #[serde(default)]
    pub jobs: Vec<Option<SubmittedJob>>,
}

/// Poll response: `{status, result?}`
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct PollResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub result: Option<JsonValue>,
}

/// The remote asynchronous scanning service
#[async_trait]
pub trait ScanService: Send + Sync {
    /// Submits one batch; a single network call
    async fn submit(&self, urls: &[String], mode: ScanMode) -> Result<SubmitResponse, ScanError>;

    /// One status request for one job
    async fn poll(&self, job_id: &str) -> Result<PollResponse, ScanError>;
}

/// HTTP implementation of [`ScanService`]
pub struct ScanClient {
    http: reqwest::Client,
    base_url: String,
}

impl ScanClient {
    pub fn new(config: &Config) -> Result<Self, ScanError> {
        Self::with_base_url(&config.scan_api_base_url, config.scan_request_timeout())
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ScanError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScanError::request_failed(base_url, e))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn submit_endpoint(&self) -> String {
        format!("{}/generate/urls", self.base_url)
    }

    fn result_endpoint(&self, job_id: &str) -> String {
        format!("{}/results/axe/{}", self.base_url, job_id)
    }
}

#[async_trait]
impl ScanService for ScanClient {
    async fn submit(&self, urls: &[String], mode: ScanMode) -> Result<SubmitResponse, ScanError> {
        let endpoint = self.submit_endpoint();
        let body = SubmitRequest::new(urls, mode);
        debug!("POST {} with {} URLs (mode {:?})", endpoint, urls.len(), body.mode);

        let response = self
            .http
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ScanError::request_failed(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::BadStatus {
                endpoint,
                status: status.as_u16(),
            });
        }

        response
            .json::<SubmitResponse>()
            .await
            .map_err(|e| ScanError::invalid_response(&endpoint, e))
    }

    async fn poll(&self, job_id: &str) -> Result<PollResponse, ScanError> {
        let endpoint = self.result_endpoint(job_id);

        let response = self
            .http
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| ScanError::request_failed(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::BadStatus {
                endpoint,
                status: status.as_u16(),
            });
        }

        response
            .json::<PollResponse>()
            .await
            .map_err(|e| ScanError::invalid_response(&endpoint, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_submit_body_shape() {
        let urls = vec!["http://x/a.pdf".to_string()];
        let pdf = serde_json::to_value(SubmitRequest::new(&urls, ScanMode::Pdf)).unwrap();
        assert_eq!(pdf, json!({"urls": [{"url": "http://x/a.pdf"}], "mode": "verapdf"}));

        let html = serde_json::to_value(SubmitRequest::new(&urls, ScanMode::Html)).unwrap();
        assert_eq!(html, json!({"urls": [{"url": "http://x/a.pdf"}]}));
    }

    #[test]
    fn test_submit_response_tolerates_nulls_and_missing_fields() {
        let resp: SubmitResponse = serde_json::from_value(json!({
            "jobs": [null, {"url": "http://x/a.pdf"}, {"url": "http://x/b.pdf", "jobId": "eq-2"}]
        }))
        .unwrap();
        assert_eq!(resp.jobs.len(), 3);
        assert!(resp.jobs[0].is_none());
        assert_eq!(resp.jobs[1].as_ref().unwrap().job_id, None);
        assert_eq!(resp.jobs[2].as_ref().unwrap().job_id.as_deref(), Some("eq-2"));

        let empty: SubmitResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.jobs.is_empty());
    }

    #[test]
    fn test_endpoints() {
        let client =
            ScanClient::with_base_url("https://scan.example/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.submit_endpoint(), "https://scan.example/generate/urls");
        assert_eq!(client.result_endpoint("eq-1"), "https://scan.example/results/axe/eq-1");
    }

    /// Live check against the configured service
    #[tokio::test]
    #[ignore]
    async fn test_live_submit() {
        let config = Config::from_env().unwrap();
        let client = ScanClient::new(&config).unwrap();
        let resp = client
            .submit(&["https://www.w3.org/WAI/ER/tests/xhtml/testfiles/resources/pdf/dummy.pdf".to_string()], ScanMode::Pdf)
            .await
            .unwrap();
        println!("jobs: {:?}", resp.jobs);
    }
}
