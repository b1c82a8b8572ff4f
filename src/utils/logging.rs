//! Logging helpers
//!
//! Subscriber setup plus the banner and summary lines printed by the run
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Default filter; the PDF parser is very chatty on malformed files
const DEFAULT_FILTER: &str = "info,lopdf=error";

/// Installs the global subscriber, honoring `RUST_LOG`
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Startup banner
pub fn log_startup(config: &Config) {
    let policy = config.poll_policy();
    info!("{}", "=".repeat(60));
    info!("🚀 PDF accessibility analysis starting");
    info!("📄 Input: {}", config.input_path.display());
    info!("📝 Output: {}", config.output_path.display());
    info!(
        "📦 Batch size: {} | poll every {:?}, up to {} attempts | {} concurrent polls",
        config.batch_size,
        policy.interval,
        policy.max_attempts(),
        config.max_concurrent_polls
    );
    if config.box_credentials().is_none() {
        info!("🔒 BOX credentials not provided, box links will be skipped");
    }
    info!("{}", "=".repeat(60));
}

/// Input sheet summary
pub fn log_input_loaded(total: usize, resumed: usize) {
    info!("✓ Loaded {} input rows", total);
    if resumed > 0 {
        info!("↻ {} rows already processed by an earlier run will be skipped", resumed);
    }
}

/// Batch hand-off
pub fn log_batch_start(batch_num: usize, mode: &str, size: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 Submitting scan batch #{} ({} mode, {} URLs)", batch_num, mode, size);
    info!("{}", "=".repeat(60));
}

/// Batch completion
pub fn log_batch_complete(batch_num: usize, completed: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ Scan batch #{} finished: {}/{} completed", batch_num, completed, total);
    info!("{}", "─".repeat(60));
}

/// Final counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub written: usize,
    pub resumed: usize,
    pub scans_completed: usize,
    pub scans_failed: usize,
    pub scans_timed_out: usize,
    pub cancelled: bool,
}

/// Final statistics block
pub fn print_final_stats(summary: &RunSummary, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📊 Analysis complete");
    info!("Finished at: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    info!("{}", "=".repeat(60));
    info!("Rows: {} written / {} input ({} resumed)", summary.written, summary.total, summary.resumed);
    info!("✅ Scans completed: {}", summary.scans_completed);
    info!("❌ Scans failed: {}", summary.scans_failed);
    info!("⏱ Scans timed out: {}", summary.scans_timed_out);
    if summary.cancelled {
        info!("⚠️ Run was cancelled before all input was processed");
    }
    info!("{}", "=".repeat(60));
    info!("\nResults saved to '{}'", config.output_path.display());
}

/// Shortens long text for log lines
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
