use std::fmt;
use std::path::PathBuf;

use crate::models::property::{parse_count, parse_flag, parse_tagged, Property, FAILED_SENTINEL};

/// Output column order
pub const OUTPUT_HEADERS: [&str; 11] = [
    "Link Type",
    "Location Type",
    "Title",
    "Link",
    "URL",
    "PDF Size (bytes)",
    "Page Count",
    "Text-based",
    "Tagged",
    "Notes",
    "Equalify Scan Results",
];

/// Where a document link points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkType {
    Pdf,
    Box,
    /// Generic web page (`html` or anything unrecognized), original text kept
    Other(String),
}

impl LinkType {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pdf" => LinkType::Pdf,
            "box" => LinkType::Box,
            _ => LinkType::Other(raw.trim().to_string()),
        }
    }

    pub fn is_box(&self) -> bool {
        matches!(self, LinkType::Box)
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkType::Pdf => f.write_str("pdf"),
            LinkType::Box => f.write_str("box"),
            LinkType::Other(s) => f.write_str(s),
        }
    }
}

/// Contents of the `Equalify Scan Results` column
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanResult {
    #[default]
    Empty,
    /// Path of the persisted result payload
    Saved(PathBuf),
    Error,
    TimedOut,
    Skipped,
    /// Whatever an earlier run wrote, carried through untouched
    Previous(String),
}

impl ScanResult {
    pub fn parse(raw: &str) -> Self {
        let cell = raw.trim();
        if cell.is_empty() {
            ScanResult::Empty
        } else {
            ScanResult::Previous(cell.to_string())
        }
    }

    /// A remote scan is still owed when nothing usable was recorded
    pub fn is_needed(&self) -> bool {
        match self {
            ScanResult::Empty => true,
            ScanResult::Previous(s) => s.eq_ignore_ascii_case(FAILED_SENTINEL),
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ScanResult::Empty)
    }
}

impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanResult::Empty => Ok(()),
            ScanResult::Saved(path) => write!(f, "{}", path.display()),
            ScanResult::Error => f.write_str("error"),
            ScanResult::TimedOut => f.write_str("timed out"),
            ScanResult::Skipped => f.write_str("skipped"),
            ScanResult::Previous(s) => f.write_str(s),
        }
    }
}

/// One row of the input sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    /// Zero-based position in the input (logging and ordering only)
    pub index: usize,
    pub link_type: LinkType,
    pub location_type: String,
    pub title: String,
    /// PDF URL or box shared link
    pub link: String,
    /// Secondary URL used for non-PDF rows
    pub url: String,
    pub size: Property<u64>,
    pub pages: Property<u32>,
    pub text_based: Property<bool>,
    pub tagged: Property<bool>,
    pub notes: String,
    pub scan_result: ScanResult,
}

impl InputRecord {
    /// Builds a record from raw cell values, as read from a sheet
    #[allow(clippy::too_many_arguments)]
    pub fn from_cells(
        index: usize,
        link_type: &str,
        location_type: &str,
        title: &str,
        link: &str,
        url: &str,
        size: &str,
        pages: &str,
        text_based: &str,
        tagged: &str,
        notes: &str,
        scan_result: &str,
    ) -> Self {
        Self {
            index,
            link_type: LinkType::parse(link_type),
            location_type: location_type.trim().to_string(),
            title: title.trim().to_string(),
            link: link.trim().to_string(),
            url: url.trim().to_string(),
            size: parse_count(size),
            pages: parse_count(pages),
            text_based: parse_flag(text_based),
            tagged: parse_tagged(tagged),
            notes: notes.trim().to_string(),
            scan_result: ScanResult::parse(scan_result),
        }
    }

    /// A bare record with only a link, everything else unknown
    pub fn with_link(index: usize, link_type: LinkType, link: impl Into<String>) -> Self {
        Self {
            index,
            link_type,
            location_type: String::new(),
            title: String::new(),
            link: link.into(),
            url: String::new(),
            size: Property::Unknown,
            pages: Property::Unknown,
            text_based: Property::Unknown,
            tagged: Property::Unknown,
            notes: String::new(),
            scan_result: ScanResult::Empty,
        }
    }

    /// The URL submitted to the scanner and used as the resume key
    pub fn target_url(&self) -> &str {
        match self.link_type {
            LinkType::Pdf | LinkType::Box => &self.link,
            LinkType::Other(_) if !self.url.is_empty() => &self.url,
            LinkType::Other(_) => &self.link,
        }
    }
}

/// One row of the output sheet: the input plus diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    pub index: usize,
    pub link_type: LinkType,
    pub location_type: String,
    pub title: String,
    pub link: String,
    pub url: String,
    pub size: Property<u64>,
    pub pages: Property<u32>,
    pub text_based: Property<bool>,
    pub tagged: Property<bool>,
    pub notes: Vec<String>,
    pub scan_result: ScanResult,
}

impl OutputRecord {
    /// Copies the input unchanged, keeping any earlier note
    pub fn pass_through(input: &InputRecord) -> Self {
        let notes = if input.notes.is_empty() {
            Vec::new()
        } else {
            vec![input.notes.clone()]
        };
        Self {
            index: input.index,
            link_type: input.link_type.clone(),
            location_type: input.location_type.clone(),
            title: input.title.clone(),
            link: input.link.clone(),
            url: input.url.clone(),
            size: input.size,
            pages: input.pages,
            text_based: input.text_based,
            tagged: input.tagged,
            notes,
            scan_result: input.scan_result.clone(),
        }
    }

    /// Copies identifying columns, replacing the notes with a single one
    pub fn with_note(input: &InputRecord, note: impl Into<String>) -> Self {
        let mut row = Self::pass_through(input);
        row.notes = vec![note.into()];
        row
    }

    /// Clears all four local properties
    pub fn clear_properties(&mut self) {
        self.size = Property::Unknown;
        self.pages = Property::Unknown;
        self.text_based = Property::Unknown;
        self.tagged = Property::Unknown;
    }

    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Semicolon-joined notes column
    pub fn notes_text(&self) -> String {
        self.notes.join("; ")
    }

    /// Cells in [`OUTPUT_HEADERS`] order
    pub fn to_cells(&self) -> [String; 11] {
        [
            self.link_type.to_string(),
            self.location_type.clone(),
            self.title.clone(),
            self.link.clone(),
            self.url.clone(),
            self.size.to_string(),
            self.pages.to_string(),
            self.text_based.to_string(),
            self.tagged.to_string(),
            self.notes_text(),
            self.scan_result.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_type_parse() {
        assert_eq!(LinkType::parse(" PDF "), LinkType::Pdf);
        assert_eq!(LinkType::parse("Box"), LinkType::Box);
        assert_eq!(LinkType::parse("html"), LinkType::Other("html".to_string()));
    }

    #[test]
    fn test_target_url_prefers_secondary_url_for_web_pages() {
        let mut record = InputRecord::with_link(0, LinkType::Other("html".into()), "Page title link");
        record.url = "https://example.edu/page".to_string();
        assert_eq!(record.target_url(), "https://example.edu/page");

        let pdf = InputRecord::with_link(1, LinkType::Pdf, "https://example.edu/a.pdf");
        assert_eq!(pdf.target_url(), "https://example.edu/a.pdf");
    }

    #[test]
    fn test_scan_result_needed() {
        assert!(ScanResult::parse("").is_needed());
        assert!(ScanResult::parse("failed").is_needed());
        assert!(!ScanResult::parse("results/job_1.json").is_needed());
        assert!(!ScanResult::TimedOut.is_needed());
        assert_eq!(ScanResult::TimedOut.to_string(), "timed out");
    }

    #[test]
    fn test_to_cells_order() {
        let input = InputRecord::from_cells(
            0, "pdf", "web", "Doc", "http://x/a.pdf", "", "2048", "3", "TRUE", "FALSE", "", "",
        );
        let mut row = OutputRecord::pass_through(&input);
        row.push_note("first");
        row.push_note("second");
        let cells = row.to_cells();
        assert_eq!(cells[0], "pdf");
        assert_eq!(cells[5], "2048");
        assert_eq!(cells[6], "3");
        assert_eq!(cells[7], "true");
        assert_eq!(cells[8], "false");
        assert_eq!(cells[9], "first; second");
        assert_eq!(cells[10], "");
    }
}
