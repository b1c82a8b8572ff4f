pub mod loaders;
pub mod property;
pub mod record;
pub mod scan_job;

pub use loaders::{load_input_records, load_previous_output, PreviousRow};
pub use property::{Property, FAILED_SENTINEL};
pub use record::{InputRecord, LinkType, OutputRecord, ScanResult, OUTPUT_HEADERS};
pub use scan_job::{JobStatus, ScanJob, ScanMode, ScanOutcome};
