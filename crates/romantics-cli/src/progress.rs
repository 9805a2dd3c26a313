use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

use romantics_core::units::{format_size, format_speed};
use romantics_core::{CopyEvent, ProgressReporter};

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸─")
        .tick_chars(TICK_CHARS)
}

/// Duplicate-scan reporter: one bar for the hashing phase.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_hash_start(&self, total_files: usize) {
        let pb = ProgressBar::new(total_files as u64);
        pb.set_style(bar_style(
            "  {spinner:.cyan} Hashing [{bar:30.cyan/dim}] {pos}/{len} files ({eta} remaining)",
        ));
        pb.enable_steady_tick(Duration::from_millis(80));

        let mut guard = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = guard.replace(pb) {
            old.finish_and_clear();
        }
    }

    fn on_hash_progress(&self, files_hashed: usize, total_files: usize, _current_path: &str) {
        let guard = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pb) = guard.as_ref() {
            // the total grows once full hashing starts
            if pb.length() != Some(total_files as u64) {
                pb.set_length(total_files as u64);
            }
            pb.set_position(files_hashed as u64);
        }
    }

    fn on_hash_complete(&self, total_groups: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  {} Hash complete: {} duplicate groups in {:.2}s",
            "✓".green(),
            total_groups,
            duration_secs
        );
    }
}

/// Draws copy-job events as a byte-based bar.
pub struct CopyRenderer {
    bar: ProgressBar,
}

impl CopyRenderer {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(bar_style(
            "  {spinner:.cyan} [{bar:30.cyan/dim}] {bytes}/{total_bytes} {msg}",
        ));
        Self { bar }
    }

    pub fn handle(&self, event: &CopyEvent) {
        match event {
            CopyEvent::Started { total_bytes, .. } => {
                self.bar.set_length(*total_bytes);
                self.bar.enable_steady_tick(Duration::from_millis(80));
            }
            CopyEvent::Progress(p) => {
                self.bar.set_position(p.bytes_copied);
                self.bar.set_message(format!(
                    "{} ({}/{} files, {})",
                    p.current_file,
                    p.files_completed + 1,
                    p.total_files,
                    format_speed(p.bytes_per_sec)
                ));
            }
            CopyEvent::FileCompleted { bytes_copied, .. } => {
                self.bar.set_position(*bytes_copied);
            }
            CopyEvent::FileSkipped { source, .. } => {
                self.bar
                    .println(format!("  {} skipped {}", "-".yellow(), source.display()));
            }
            CopyEvent::Finished { .. } => {
                self.bar.finish_and_clear();
            }
        }
    }
}

pub fn print_size_line(label: &str, bytes: u64) {
    println!("{:>12}  {}", format_size(bytes).cyan(), label);
}
