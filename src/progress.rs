use crate::engine::ScanSummary;
use crate::error::Error;
use std::path::Path;

/// Trait for reporting scan progress.
///
/// The CLI implements it with an indicatif spinner; tests use `SilentReporter`.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self, _root: &Path) {}
    fn on_object_scanned(&self, _objects_seen: usize, _current_path: &Path) {}
    fn on_object_failed(&self, _path: &Path, _error: &Error) {}
    fn on_scan_complete(&self, _summary: &ScanSummary) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
