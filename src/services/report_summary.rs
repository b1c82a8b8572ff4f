//! Report summary - capability layer
//!
//! Reads persisted scan results back from the results directory and totals
//! the PDF validation figures. Files that do not look like a PDF validation
//! report are counted as errors instead of aborting the summary.

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Validation figures for one result file
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub job_id: String,
    pub file_name: String,
    pub passed_checks: u64,
    pub failed_checks: u64,
    pub compliant: bool,
    /// `(description, failed checks)` for each failed rule
    pub failed_rules: Vec<(String, u64)>,
}

/// A result file that could not be summarized
#[derive(Debug, Clone, PartialEq)]
pub struct ReportError {
    pub path: PathBuf,
    pub reason: String,
}

/// One failing rule, aggregated over all files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueCount {
    pub description: String,
    pub failed_checks: u64,
    /// Number of files the rule failed in
    pub files: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportTotals {
    pub files: usize,
    pub compliant: usize,
    pub errors: usize,
    pub passed_checks: u64,
    pub failed_checks: u64,
}

#[derive(Debug, Default)]
pub struct ReportSummary {
    pub entries: Vec<ReportEntry>,
    pub errors: Vec<ReportError>,
}

impl ReportSummary {
    /// Loads every `job_*.json` file in `dir`, in file name order
    pub async fn load(dir: &Path) -> Result<Self> {
        let mut paths = Vec::new();
        let mut read_dir = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("Failed to read results directory {}", dir.display()))?;
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            if is_result_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut summary = Self::default();
        for path in paths {
            let parsed = match tokio::fs::read_to_string(&path).await {
                Ok(content) => parse_report(&path, &content),
                Err(e) => Err(e.to_string()),
            };
            match parsed {
                Ok(entry) => summary.entries.push(entry),
                Err(reason) => {
                    warn!("→ Skipping {}: {}", path.display(), reason);
                    summary.errors.push(ReportError { path, reason });
                }
            }
        }
        Ok(summary)
    }

    pub fn totals(&self) -> ReportTotals {
        ReportTotals {
            files: self.entries.len() + self.errors.len(),
            compliant: self.entries.iter().filter(|e| e.compliant).count(),
            errors: self.errors.len(),
            passed_checks: self.entries.iter().map(|e| e.passed_checks).sum(),
            failed_checks: self.entries.iter().map(|e| e.failed_checks).sum(),
        }
    }

    /// Failed rules across all files, most failed checks first
    pub fn issues(&self) -> Vec<IssueCount> {
        let mut checks: HashMap<&str, u64> = HashMap::new();
        let mut files: HashMap<&str, HashSet<&str>> = HashMap::new();
        for entry in &self.entries {
            for (description, failed) in &entry.failed_rules {
                *checks.entry(description.as_str()).or_default() += failed;
                files
                    .entry(description.as_str())
                    .or_default()
                    .insert(entry.job_id.as_str());
            }
        }

        let mut issues: Vec<IssueCount> = checks
            .into_iter()
            .map(|(description, failed_checks)| IssueCount {
                description: description.to_string(),
                failed_checks,
                files: files.get(description).map_or(0, HashSet::len),
            })
            .collect();
        issues.sort_by(|a, b| {
            b.failed_checks
                .cmp(&a.failed_checks)
                .then_with(|| a.description.cmp(&b.description))
        });
        issues
    }

    pub fn log(&self, dir: &Path) {
        let totals = self.totals();
        info!("{}", "=".repeat(60));
        info!("📊 Scan report for {}", dir.display());
        info!("  Result files:     {}", totals.files);
        info!("  Compliant:        {}", totals.compliant);
        info!("  Parse errors:     {}", totals.errors);
        info!("  Passed checks:    {}", totals.passed_checks);
        info!("  Failed checks:    {}", totals.failed_checks);

        let issues = self.issues();
        if !issues.is_empty() {
            info!("{}", "-".repeat(60));
            info!("Top failing rules:");
            let parsed = self.entries.len().max(1);
            for issue in issues.iter().take(10) {
                info!(
                    "  {:>5} checks  {:>5.1}% of files  {}",
                    issue.failed_checks,
                    issue.files as f64 * 100.0 / parsed as f64,
                    crate::utils::logging::truncate_text(&issue.description, 80)
                );
            }
        }
        info!("{}", "=".repeat(60));
    }
}

fn is_result_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("job_") && n.ends_with(".json"))
}

fn parse_report(path: &Path, content: &str) -> std::result::Result<ReportEntry, String> {
    let data: JsonValue = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let validation = data
        .pointer("/PDFresults/report/jobs/0/validationResult/0")
        .ok_or("no PDF validation result")?;
    let details = validation.get("details").ok_or("validation result has no details")?;

    let passed_checks = details
        .get("passedChecks")
        .and_then(JsonValue::as_u64)
        .ok_or("missing passedChecks")?;
    let failed_checks = details
        .get("failedChecks")
        .and_then(JsonValue::as_u64)
        .ok_or("missing failedChecks")?;
    let compliant = validation
        .get("compliant")
        .and_then(JsonValue::as_bool)
        .ok_or("missing compliant flag")?;

    let file_name = details
        .get("fileName")
        .and_then(JsonValue::as_str)
        .filter(|s| !s.is_empty())
        .or_else(|| validation.get("object").and_then(JsonValue::as_str))
        .unwrap_or("Unknown")
        .to_string();

    let job_id = data
        .get("jobID")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .or_else(|| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .unwrap_or_default();

    let mut failed_rules = Vec::new();
    if let Some(rules) = details.get("ruleSummaries").and_then(JsonValue::as_array) {
        for rule in rules {
            if rule.get("status").and_then(JsonValue::as_str) != Some("failed") {
                continue;
            }
            let description = rule
                .get("description")
                .and_then(JsonValue::as_str)
                .unwrap_or("Unknown issue")
                .to_string();
            let failed = rule.get("failedChecks").and_then(JsonValue::as_u64).unwrap_or(1);
            failed_rules.push((description, failed));
        }
    }

    Ok(ReportEntry {
        job_id,
        file_name,
        passed_checks,
        failed_checks,
        compliant,
        failed_rules,
    })
}
