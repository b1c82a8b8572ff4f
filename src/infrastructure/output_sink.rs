//! Output sheet writer - infrastructure layer
//!
//! The only writer of the output file. Rows are appended and flushed one at
//! a time behind a mutex on the blocking pool; a row index is never written
//! twice in one run.

use crate::error::StoreError;
use crate::models::{OutputRecord, OUTPUT_HEADERS};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error};

struct SinkState {
    writer: csv::Writer<File>,
    written: HashSet<usize>,
}

/// Append-only output stream
pub struct OutputSink {
    path: PathBuf,
    state: Arc<Mutex<SinkState>>,
}

impl OutputSink {
    /// Starts a fresh output file: header, then rows carried over from an
    /// earlier run (already in output column order).
    pub fn create(path: &Path, carried_over: &[Vec<String>]) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|source| StoreError::WriteFailed {
                path: path.to_path_buf(),
                source,
            })?;

        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(OUTPUT_HEADERS)?;
        for cells in carried_over {
            writer.write_record(cells)?;
        }
        writer.flush().map_err(|source| StoreError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            state: Arc::new(Mutex::new(SinkState {
                writer,
                written: HashSet::new(),
            })),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row and flushes it to disk.
    ///
    /// # Parameters
    /// - `row`: the finished row; its index identifies it for the run
    ///
    /// # Returns
    /// `false` if this row index was already written this run
    pub async fn write(&self, row: &OutputRecord) -> Result<bool, StoreError> {
        let state = Arc::clone(&self.state);
        let path = self.path.clone();
        let index = row.index;
        let cells = row.to_cells();

        tokio::task::spawn_blocking(move || -> Result<bool, StoreError> {
            let mut state = lock(&state);
            if !state.written.insert(index) {
                error!("[row {}] already written, ignoring second write", index + 1);
                return Ok(false);
            }

            state.writer.write_record(&cells)?;
            state
                .writer
                .flush()
                .map_err(|source| StoreError::WriteFailed {
                    path: path.clone(),
                    source,
                })?;

            debug!("[row {}] written to {}", index + 1, path.display());
            Ok(true)
        })
        .await?
    }

    /// Number of rows appended this run
    pub async fn written(&self) -> usize {
        lock(&self.state).written.len()
    }
}

/// A panicked writer leaves the file consistent up to its last flush
fn lock(state: &Mutex<SinkState>) -> MutexGuard<'_, SinkState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
