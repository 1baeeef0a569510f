use archive_indexer::{Error, ProgressReporter, ScanSummary};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Spinner on stderr while a scan runs.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self, root: &Path) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        pb.set_message(format!("Scanning {}...", root.display()));
        pb.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn on_object_scanned(&self, objects_seen: usize, current_path: &Path) {
        self.with_bar(|pb| {
            let name = current_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            pb.set_message(format!("Scanning... {} objects ({})", objects_seen, name));
        });
    }

    fn on_object_failed(&self, path: &Path, _error: &Error) {
        self.with_bar(|pb| {
            pb.println(format!("  {} {}", "✗".red(), path.display()));
        });
    }

    fn on_scan_complete(&self, summary: &ScanSummary) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
        eprintln!(
            "  {} Scan complete in {:.2}s",
            "✓".green(),
            summary.duration.as_secs_f64()
        );
    }
}
