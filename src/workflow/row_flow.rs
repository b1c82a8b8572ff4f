//! Row flow - workflow layer
//!
//! Defines what happens to one input row before any remote scan:
//! 1. classify (full skip / scan only / pass through / local work)
//! 2. retrieve the document bytes when local properties are owed
//! 3. extract the owed properties
//! 4. decide whether the row still needs a remote scan
//!
//! The flow owns no output state. Rows come back either finished or
//! bound for a scan batch.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clients::DocumentFetcher;
use crate::error::FetchError;
use crate::models::{InputRecord, LinkType, OutputRecord, Property, ScanMode};
use crate::services::{
    needs_remote_scan, Disposition, LocalProperties, NeededChecks, PropertyExtractor, RowClassifier,
    FULL_SKIP_NOTE,
};
use crate::workflow::row_ctx::RowCtx;

pub const SCAN_ONLY_NOTE: &str = "Only remote scan required";
pub const NOT_PDF_NOTE: &str = "Skipped: Not a PDF link";
pub const NO_BOX_CREDENTIALS_NOTE: &str = "Skipped: BOX credentials not provided";

/// Where a row goes after the flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// Ready to be written
    Done(OutputRecord),
    /// Owed a remote scan of `url`
    Enqueue {
        mode: ScanMode,
        url: String,
        row: OutputRecord,
    },
}

/// Per-row processing flow
///
/// - classifies the row and decides what to fetch
/// - holds no output resources, only capabilities
pub struct RowFlow {
    classifier: RowClassifier,
    fetcher: Arc<dyn DocumentFetcher>,
    extractor: Arc<dyn PropertyExtractor>,
    fetch_timeout: Duration,
}

impl RowFlow {
    pub fn new(
        fetcher: Arc<dyn DocumentFetcher>,
        extractor: Arc<dyn PropertyExtractor>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            classifier: RowClassifier::new(),
            fetcher,
            extractor,
            fetch_timeout,
        }
    }

    pub async fn run(&self, record: &InputRecord, ctx: &RowCtx) -> RowOutcome {
        let classification = self.classifier.classify(record);
        let needed = classification.needed;
        debug!("{} {:?} needs {:?}", ctx, classification.disposition, needed);

        match classification.disposition {
            Disposition::FullSkip => {
                info!("{} ⏭ all local checks failed before, skipping", ctx);
                RowOutcome::Done(OutputRecord::with_note(record, FULL_SKIP_NOTE))
            }
            Disposition::PassThrough => {
                debug!("{} nothing owed, copying", ctx);
                RowOutcome::Done(OutputRecord::pass_through(record))
            }
            Disposition::ScanOnly => {
                info!("{} only the remote scan is owed", ctx);
                let mut row = OutputRecord::pass_through(record);
                row.notes.clear();
                row.push_note(SCAN_ONLY_NOTE);
                enqueue(record, row)
            }
            Disposition::NeedsLocalWork => self.local_work(record, needed, ctx).await,
        }
    }

    async fn local_work(&self, record: &InputRecord, needed: NeededChecks, ctx: &RowCtx) -> RowOutcome {
        let mut row = OutputRecord::pass_through(record);
        row.notes.clear();

        match &record.link_type {
            LinkType::Box if !self.fetcher.box_enabled() => {
                warn!("{} box link but no BOX credentials", ctx);
                row.clear_properties();
                row.push_note(NO_BOX_CREDENTIALS_NOTE);
                return RowOutcome::Done(row);
            }
            LinkType::Other(kind) => {
                info!("{} ⏭ not a PDF link ({})", ctx, kind);
                row.push_note(NOT_PDF_NOTE);
                return if needed.remote_scan {
                    enqueue(record, row)
                } else {
                    RowOutcome::Done(row)
                };
            }
            _ => {}
        }

        info!("{} 📥 retrieving {}", ctx, record.link);
        let bytes = match self.fetch(record).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("{} retrieval failed: {}", ctx, e);
                row.clear_properties();
                row.push_note(match record.link_type {
                    LinkType::Box => format!("Skipped: Box access failed - {}", e),
                    _ => format!("Download failed: {}", e),
                });
                return RowOutcome::Done(row);
            }
        };

        let props = self.extract(bytes, needed).await;
        merge(&mut row, needed, props);
        info!(
            "{} ✓ size={} pages={} text={} tagged={}",
            ctx, row.size, row.pages, row.text_based, row.tagged
        );

        // A freshly found tag makes the row owe a scan in this run
        if needs_remote_scan(&row.link_type, &row.tagged, &row.scan_result) {
            enqueue(record, row)
        } else {
            RowOutcome::Done(row)
        }
    }

    async fn fetch(&self, record: &InputRecord) -> Result<Vec<u8>, FetchError> {
        match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(record)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.fetch_timeout)),
        }
    }

    /// Extraction is CPU-bound, so it runs on the blocking pool
    async fn extract(&self, bytes: Vec<u8>, needed: NeededChecks) -> LocalProperties {
        let extractor = Arc::clone(&self.extractor);
        match tokio::task::spawn_blocking(move || extractor.extract(&bytes, &needed)).await {
            Ok(props) => props,
            Err(e) => {
                warn!("→ Extraction task failed: {}", e);
                let mut props = LocalProperties::default();
                if needed.pages {
                    props.pages = Property::Failed;
                }
                if needed.text {
                    props.text_based = Property::Failed;
                }
                if needed.tagged {
                    props.tagged = Property::Failed;
                }
                props.notes.push(format!("Extraction failed: {}", e));
                props
            }
        }
    }
}

/// Owed properties take the fresh value; the rest keep the input's
fn merge(row: &mut OutputRecord, needed: NeededChecks, props: LocalProperties) {
    if needed.size {
        row.size = props.size;
    }
    if needed.pages {
        row.pages = props.pages;
    }
    if needed.text {
        row.text_based = props.text_based;
    }
    if needed.tagged {
        row.tagged = props.tagged;
    }
    row.notes.extend(props.notes);
}

fn enqueue(record: &InputRecord, row: OutputRecord) -> RowOutcome {
    let mode = match record.link_type {
        LinkType::Pdf => ScanMode::Pdf,
        _ => ScanMode::Html,
    };
    RowOutcome::Enqueue {
        mode,
        url: record.target_url().to_string(),
        row,
    }
}
