/// Trait for reporting duplicate-scan progress.
///
/// The CLI implements it with indicatif bars. All methods have default no-op
/// implementations. Copy jobs report through [`crate::copier::CopyEvent`]
/// instead, since they run on their own worker thread.
pub trait ProgressReporter: Send + Sync {
    fn on_hash_start(&self, _total_files: usize) {}
    fn on_hash_progress(&self, _files_hashed: usize, _total_files: usize, _current_path: &str) {}
    fn on_hash_complete(&self, _total_groups: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
