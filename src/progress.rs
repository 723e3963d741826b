/// Trait for reporting organize-run progress.
///
/// The CLI implements it with indicatif; tests use [`SilentReporter`].
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self) {}
    fn on_scan_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_progress(&self, _processed: usize, _moved: usize) {}
    fn on_analysis_complete(&self, _processed: usize) {}
    fn on_move_complete(&self, _moved: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
