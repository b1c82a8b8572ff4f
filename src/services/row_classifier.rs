//! Row classifier - capability layer
//!
//! Pure decision over one input record: which checks are still owed and
//! what the row flow should do about them. No I/O.

use crate::models::{InputRecord, LinkType, Property, ScanResult};

/// Checks that still have to run for a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NeededChecks {
    pub size: bool,
    pub pages: bool,
    pub text: bool,
    pub tagged: bool,
    pub remote_scan: bool,
}

impl NeededChecks {
    /// Any of the four locally computed properties
    pub fn any_local(&self) -> bool {
        self.size || self.pages || self.text || self.tagged
    }

    pub fn any(&self) -> bool {
        self.any_local() || self.remote_scan
    }
}

/// What to do with a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Every local check failed before and no scan is owed
    FullSkip,
    /// Only the remote scan is owed; no download needed
    ScanOnly,
    /// Nothing owed; copy as-is
    PassThrough,
    /// Download and compute local properties
    NeedsLocalWork,
}

/// Classifier result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub disposition: Disposition,
    pub needed: NeededChecks,
}

/// Note attached to fully skipped rows
pub const FULL_SKIP_NOTE: &str = "Skipped: all tests previously failed";

/// A remote scan is owed for tagged, not box-hosted documents that have no
/// usable scan result yet.
pub fn needs_remote_scan(link_type: &LinkType, tagged: &Property<bool>, scan_result: &ScanResult) -> bool {
    !link_type.is_box() && tagged.value() == Some(&true) && scan_result.is_needed()
}

/// Stateless classifier
#[derive(Debug, Default, Clone, Copy)]
pub struct RowClassifier;

impl RowClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, record: &InputRecord) -> Classification {
        let needed = NeededChecks {
            size: record.size.is_needed(),
            pages: record.pages.is_needed(),
            text: record.text_based.is_needed(),
            tagged: record.tagged.is_needed(),
            remote_scan: needs_remote_scan(&record.link_type, &record.tagged, &record.scan_result),
        };

        let all_failed = record.size.is_failed()
            && record.pages.is_failed()
            && record.text_based.is_failed()
            && record.tagged.is_failed();

        let disposition = if all_failed && !needed.remote_scan {
            Disposition::FullSkip
        } else if needed.remote_scan && !needed.any_local() {
            Disposition::ScanOnly
        } else if !needed.any() {
            Disposition::PassThrough
        } else {
            Disposition::NeedsLocalWork
        };

        Classification { disposition, needed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(link_type: &str, size: &str, pages: &str, text: &str, tagged: &str, scan: &str) -> InputRecord {
        InputRecord::from_cells(0, link_type, "", "", "http://x/a.pdf", "", size, pages, text, tagged, "", scan)
    }

    #[test]
    fn test_all_failed_is_full_skip() {
        let c = RowClassifier::new().classify(&record("pdf", "FAILED", "FAILED", "FAILED", "FAILED", ""));
        assert_eq!(c.disposition, Disposition::FullSkip);
        assert!(!c.needed.remote_scan);
    }

    #[test]
    fn test_fresh_record_needs_local_work() {
        let c = RowClassifier::new().classify(&record("pdf", "", "", "", "", ""));
        assert_eq!(c.disposition, Disposition::NeedsLocalWork);
        assert!(c.needed.any_local());
        assert!(!c.needed.remote_scan);
    }

    #[test]
    fn test_tagged_without_scan_is_scan_only() {
        let c = RowClassifier::new().classify(&record("pdf", "2048", "3", "true", "TRUE", ""));
        assert_eq!(c.disposition, Disposition::ScanOnly);
        assert!(c.needed.remote_scan);

        let c = RowClassifier::new().classify(&record("pdf", "2048", "3", "true", "TRUE", "FAILED"));
        assert_eq!(c.disposition, Disposition::ScanOnly);
    }

    #[test]
    fn test_complete_record_passes_through() {
        let c = RowClassifier::new().classify(&record("pdf", "2048", "3", "true", "TRUE", "results/job_1.json"));
        assert_eq!(c.disposition, Disposition::PassThrough);

        let c = RowClassifier::new().classify(&record("pdf", "2048", "3", "true", "FALSE", ""));
        assert_eq!(c.disposition, Disposition::PassThrough);
    }

    #[test]
    fn test_box_is_never_scanned_remotely() {
        let c = RowClassifier::new().classify(&record("box", "2048", "3", "true", "TRUE", ""));
        assert!(!c.needed.remote_scan);
        assert_eq!(c.disposition, Disposition::PassThrough);
    }

    #[test]
    fn test_partial_failure_is_retried() {
        let c = RowClassifier::new().classify(&record("pdf", "2048", "FAILED", "true", "FALSE", ""));
        assert_eq!(c.disposition, Disposition::NeedsLocalWork);
        assert!(c.needed.pages);
        assert!(!c.needed.size);
    }
}
