pub mod batch_accumulator;
pub mod job_poller;
pub mod property_extractor;
pub mod report_summary;
pub mod result_reconciler;
pub mod row_classifier;
pub mod scan_dispatcher;

pub use batch_accumulator::{BatchAccumulators, PushResult, ScanBatch, DUPLICATE_URL_NOTE};
pub use job_poller::JobPoller;
pub use property_extractor::{LocalProperties, LopdfExtractor, PropertyExtractor};
pub use report_summary::{ReportSummary, ReportTotals};
pub use result_reconciler::{apply_outcome, ResultReconciler};
pub use row_classifier::{needs_remote_scan, Classification, Disposition, NeededChecks, RowClassifier, FULL_SKIP_NOTE};
pub use scan_dispatcher::{Assignment, ScanDispatcher};
