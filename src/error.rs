use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Document retrieval errors
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),
    /// Scan service errors
    #[error("scan service error: {0}")]
    Scan(#[from] ScanError),
    /// Results directory / output file errors
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors while retrieving document bytes
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("Not a PDF based on Content-Type ({0})")]
    NotPdf(String),
    #[error("Box item is not a file")]
    BoxNotAFile,
    #[error("Box file is not a PDF")]
    BoxNotPdf,
    #[error("BOX credentials not provided")]
    MissingCredentials,
    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

/// Errors talking to the remote scanning service
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("request to {endpoint} failed: {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned HTTP {status}")]
    BadStatus { endpoint: String, status: u16 },
    #[error("invalid response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },
}

impl ScanError {
    pub fn request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        ScanError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub fn invalid_response(endpoint: impl Into<String>, message: impl ToString) -> Self {
        ScanError::InvalidResponse {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }
}

/// Errors writing durable state
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unable to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to encode result payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("unable to write output row: {0}")]
    Csv(#[from] csv::Error),
    #[error("output writer task failed: {0}")]
    WriterTask(#[from] tokio::task::JoinError),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {var_name}: value '{value}' is not a valid {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    #[error("unable to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    TomlParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

/// Application result type
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_messages_match_notes() {
        assert_eq!(FetchError::BoxNotPdf.to_string(), "Box file is not a PDF");
        assert_eq!(
            FetchError::NotPdf("text/html".into()).to_string(),
            "Not a PDF based on Content-Type (text/html)"
        );
    }

    #[test]
    fn test_app_error_wraps_config() {
        let err: AppError = ConfigError::Zero { field: "batch_size" }.into();
        assert_eq!(
            err.to_string(),
            "configuration error: batch_size must be greater than zero"
        );
    }
}
