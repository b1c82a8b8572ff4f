//! Batch accumulator - capability layer
//!
//! Buffers URLs owed a remote scan into bounded batches, one open batch per
//! scan mode, and keeps the `url → row` mapping used to reconcile results.

use crate::models::{OutputRecord, ScanMode};
use std::collections::HashMap;
use tracing::warn;

/// Note put on a row whose URL was claimed again by a later row
pub const DUPLICATE_URL_NOTE: &str = "Duplicate URL: scan result recorded on a later row";

/// A closed batch, ready for submission. Owns its rows.
#[derive(Debug)]
pub struct ScanBatch {
    pub mode: ScanMode,
    /// Submission order
    pub urls: Vec<String>,
    pub rows: HashMap<String, OutputRecord>,
}

impl ScanBatch {
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// One open batch for one mode
#[derive(Debug)]
pub struct BatchAccumulator {
    mode: ScanMode,
    capacity: usize,
    urls: Vec<String>,
    rows: HashMap<String, OutputRecord>,
}

impl BatchAccumulator {
    pub fn new(mode: ScanMode, capacity: usize) -> Self {
        Self {
            mode,
            capacity: capacity.max(1),
            urls: Vec::new(),
            rows: HashMap::new(),
        }
    }

    /// Adds a URL and the row its result belongs to.
    ///
    /// A URL already in the open batch keeps its place; the new row replaces
    /// the old mapping (last write wins) and the displaced row is returned,
    /// annotated, so the caller can still emit it.
    pub fn push(&mut self, url: String, row: OutputRecord) -> Option<OutputRecord> {
        match self.rows.insert(url.clone(), row) {
            Some(mut displaced) => {
                warn!(
                    "[row {}] duplicate URL in {} batch, mapping moved to a later row: {}",
                    displaced.index + 1,
                    self.mode,
                    url
                );
                displaced.push_note(DUPLICATE_URL_NOTE);
                Some(displaced)
            }
            None => {
                self.urls.push(url);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.urls.len() >= self.capacity
    }

    /// Closes the open batch and starts a new empty one
    pub fn take(&mut self) -> Option<ScanBatch> {
        if self.urls.is_empty() {
            return None;
        }
        Some(ScanBatch {
            mode: self.mode,
            urls: std::mem::take(&mut self.urls),
            rows: std::mem::take(&mut self.rows),
        })
    }
}

/// Result of adding one URL
#[derive(Debug, Default)]
pub struct PushResult {
    /// Row displaced by a duplicate URL; must still be written
    pub displaced: Option<OutputRecord>,
    /// Batch that reached capacity
    pub ready: Option<ScanBatch>,
}

/// One accumulator per scan mode
#[derive(Debug)]
pub struct BatchAccumulators {
    pdf: BatchAccumulator,
    html: BatchAccumulator,
}

impl BatchAccumulators {
    pub fn new(capacity: usize) -> Self {
        Self {
            pdf: BatchAccumulator::new(ScanMode::Pdf, capacity),
            html: BatchAccumulator::new(ScanMode::Html, capacity),
        }
    }

    fn get_mut(&mut self, mode: ScanMode) -> &mut BatchAccumulator {
        match mode {
            ScanMode::Pdf => &mut self.pdf,
            ScanMode::Html => &mut self.html,
        }
    }

    /// Adds a URL; hands back the batch once it is full
    pub fn push(&mut self, mode: ScanMode, url: String, row: OutputRecord) -> PushResult {
        let acc = self.get_mut(mode);
        let displaced = acc.push(url, row);
        let ready = if acc.is_full() { acc.take() } else { None };
        PushResult { displaced, ready }
    }

    /// Flushes every partial batch (end of input)
    pub fn drain(&mut self) -> Vec<ScanBatch> {
        [self.pdf.take(), self.html.take()].into_iter().flatten().collect()
    }

    pub fn pending(&self) -> usize {
        self.pdf.len() + self.html.len()
    }
}
