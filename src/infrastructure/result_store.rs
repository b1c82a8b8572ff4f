//! Results directory - infrastructure layer
//!
//! Owns the directory of persisted scan payloads. One file per job id,
//! written once, so concurrent writers never touch the same file.

use crate::error::StoreError;
use regex::{Captures, Regex};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::fs;
use tracing::debug;

/// Persisted scan payload store
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a job's payload is stored in
    pub fn path_for(&self, job_id: &str) -> PathBuf {
        self.dir.join(format!("job_{}.json", sanitize_job_id(job_id)))
    }

    /// Writes the payload verbatim, creating the directory if needed.
    ///
    /// # Parameters
    /// - `job_id`: raw id from the scanning service
    /// - `payload`: the `result` object of the completed poll
    ///
    /// # Returns
    /// The file path, only after the write has completed
    pub async fn persist(&self, job_id: &str, payload: &JsonValue) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.path_for(job_id);
        let bytes = serde_json::to_vec(payload)?;
        fs::write(&path, bytes)
            .await
            .map_err(|source| StoreError::WriteFailed {
                path: path.clone(),
                source,
            })?;

        debug!("Saved scan result for job {} to {}", job_id, path.display());
        Ok(path)
    }

    /// Deletes every persisted payload (full reset)
    pub async fn purge(&self) -> Result<(), StoreError> {
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::WriteFailed {
                path: self.dir.clone(),
                source,
            }),
        }
    }
}

/// Job ids are opaque; keep them filename-safe.
///
/// Bytes outside `[A-Za-z0-9._-]` become `%XX` (so `%` itself is escaped),
/// and an id made only of dots is escaped in full. Distinct ids always map to
/// distinct names.
fn sanitize_job_id(job_id: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").expect("valid regex"));

    if !job_id.is_empty() && job_id.chars().all(|c| c == '.') {
        return job_id.replace('.', "%2E");
    }
    re.replace_all(job_id, |caps: &Captures| percent_encode(&caps[0]))
        .into_owned()
}

fn percent_encode(s: &str) -> String {
    s.bytes().map(|b| format!("%{:02X}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_job_id() {
        assert_eq!(sanitize_job_id("eq-123_ab.c"), "eq-123_ab.c");
        assert_eq!(sanitize_job_id("../../etc/passwd"), "..%2F..%2Fetc%2Fpasswd");
        assert_eq!(sanitize_job_id(".."), "%2E%2E");
        assert_eq!(sanitize_job_id("50%"), "50%25");
        assert_eq!(sanitize_job_id("é"), "%C3%A9");
    }

    #[test]
    fn test_distinct_ids_get_distinct_files() {
        let store = ResultStore::new("results");
        let ids = ["eq/1", "eq:1", "eq_1", "eq%2F1", "eq 1", ".", "..", "%2E", ""];
        let paths: std::collections::HashSet<PathBuf> =
            ids.iter().map(|id| store.path_for(id)).collect();
        assert_eq!(paths.len(), ids.len());
    }

    #[tokio::test]
    async fn test_colliding_looking_ids_keep_their_own_payloads() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ResultStore::new(tmp.path().join("results"));

        let first = store.persist("eq/1", &json!({"job": "first"})).await.unwrap();
        let second = store.persist("eq:1", &json!({"job": "second"})).await.unwrap();

        assert_ne!(first, second);
        let read = |p: &Path| -> JsonValue { serde_json::from_slice(&std::fs::read(p).unwrap()).unwrap() };
        assert_eq!(read(&first), json!({"job": "first"}));
        assert_eq!(read(&second), json!({"job": "second"}));
    }

    #[tokio::test]
    async fn test_persist_creates_directory_and_writes_verbatim() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ResultStore::new(tmp.path().join("results"));
        let payload = json!({"jobID": "eq-1", "PDFresults": {"report": {}}});

        let path = store.persist("eq-1", &payload).await.unwrap();

        assert_eq!(path, tmp.path().join("results").join("job_eq-1.json"));
        let written: JsonValue = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written, payload);
    }

    #[tokio::test]
    async fn test_purge_missing_directory_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ResultStore::new(tmp.path().join("nothing-here"));
        tokio_test::assert_ok!(store.purge().await);
    }
}
