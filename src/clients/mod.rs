pub mod fetcher;
pub mod scan_client;

pub use fetcher::{BoxFetcher, DocumentFetcher, HttpFetcher, LinkFetcher};
pub use scan_client::{PollResponse, ScanClient, ScanService, SubmitResponse, SubmittedJob};
