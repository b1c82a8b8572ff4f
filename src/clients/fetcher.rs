//! Document retrieval
//!
//! Plain HTTP downloads for PDF links and the Box shared-link API for
//! box-hosted files.
use crate::config::{BoxCredentials, Config};
use crate::error::FetchError;
use crate::models::{InputRecord, LinkType};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const BOX_API_BASE: &str = "https://api.box.com/2.0";

/// Fetches the raw bytes of the document a record points to
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, record: &InputRecord) -> Result<Vec<u8>, FetchError>;

    /// Whether box-hosted documents can be retrieved at all
    fn box_enabled(&self) -> bool;
}

/// Downloads a PDF over HTTP
#[derive(Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Requires a success status and a PDF content type
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!("GET {}", url);
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.contains("application/pdf") {
            return Err(FetchError::NotPdf(content_type));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Shared item metadata returned by Box
#[derive(Debug, Deserialize)]
struct BoxItem {
    #[serde(rename = "type")]
    kind: String,
    id: String,
    #[serde(default)]
    name: String,
}

/// Downloads files behind Box shared links
#[derive(Clone)]
pub struct BoxFetcher {
    http: reqwest::Client,
    credentials: BoxCredentials,
    api_base: String,
}

impl BoxFetcher {
    pub fn new(credentials: BoxCredentials, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            credentials,
            api_base: BOX_API_BASE.to_string(),
        })
    }

    pub fn client_id(&self) -> &str {
        &self.credentials.client_id
    }

    fn authorized(&self, request: reqwest::RequestBuilder, shared_link: &str) -> reqwest::RequestBuilder {
        request
            .header(AUTHORIZATION, format!("Bearer {}", self.credentials.access_token))
            .header("BoxApi", format!("shared_link={}", shared_link))
    }

    /// Resolves the shared link, checks it is a PDF file, downloads it
    pub async fn download(&self, shared_link: &str) -> Result<Vec<u8>, FetchError> {
        let item_url = format!("{}/shared_items", self.api_base);
        let response = self
            .authorized(self.http.get(&item_url), shared_link)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        let item: BoxItem = response.json().await?;
        check_box_item(&item)?;

        let content_url = format!("{}/files/{}/content", self.api_base, item.id);
        debug!("Downloading box file {} ({})", item.id, item.name);
        let response = self
            .authorized(self.http.get(&content_url), shared_link)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

fn check_box_item(item: &BoxItem) -> Result<(), FetchError> {
    if item.kind != "file" {
        return Err(FetchError::BoxNotAFile);
    }
    if !item.name.to_lowercase().ends_with(".pdf") {
        return Err(FetchError::BoxNotPdf);
    }
    Ok(())
}

/// Routes each record to the right retrieval path
pub struct LinkFetcher {
    http: HttpFetcher,
    boxed: Option<BoxFetcher>,
}

impl LinkFetcher {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let http = HttpFetcher::new(config.fetch_timeout())?;
        let boxed = config
            .box_credentials()
            .map(|creds| BoxFetcher::new(creds, config.fetch_timeout()))
            .transpose()?;
        if let Some(fetcher) = &boxed {
            debug!("Box retrieval enabled for client {}", fetcher.client_id());
        }
        Ok(Self { http, boxed })
    }
}

#[async_trait]
impl DocumentFetcher for LinkFetcher {
    async fn fetch(&self, record: &InputRecord) -> Result<Vec<u8>, FetchError> {
        match record.link_type {
            LinkType::Box => match &self.boxed {
                Some(fetcher) => fetcher.download(&record.link).await,
                None => Err(FetchError::MissingCredentials),
            },
            _ => self.http.download(&record.link).await,
        }
    }

    fn box_enabled(&self) -> bool {
        self.boxed.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(kind: &str, name: &str) -> BoxItem {
        BoxItem {
            kind: kind.to_string(),
            id: "1".to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_box_item_checks() {
        assert!(check_box_item(&item("file", "Report.PDF")).is_ok());
        assert!(matches!(
            check_box_item(&item("folder", "docs")),
            Err(FetchError::BoxNotAFile)
        ));
        assert!(matches!(
            check_box_item(&item("file", "notes.docx")),
            Err(FetchError::BoxNotPdf)
        ));
    }

    #[tokio::test]
    async fn test_box_disabled_without_credentials() {
        let fetcher = LinkFetcher::new(&Config::default()).unwrap();
        assert!(!fetcher.box_enabled());

        let record = InputRecord::with_link(0, LinkType::Box, "https://app.box.com/s/abc");
        assert!(matches!(
            fetcher.fetch(&record).await,
            Err(FetchError::MissingCredentials)
        ));
    }
}
