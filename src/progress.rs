/// Trait for reporting warm-up scan progress.
///
/// The CLI implements it with indicatif. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self, _scan_folders: usize) {}
    fn on_scan_progress(&self, _entries_found: usize, _current_path: &str) {}
    fn on_scan_complete(&self, _total_entries: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
