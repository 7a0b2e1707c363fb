//! Terminal progress display for downloads and network waits.
//!
//! Everything is drawn to stderr with `indicatif`. When progress is disabled
//! (`--no-progress`, or stderr is not a terminal) hidden bars are used, so
//! callers never need to branch on it.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

use crate::upgrade::ProgressReporter;

/// Whether progress should be drawn at all.
#[must_use]
pub fn progress_enabled(no_progress: bool) -> bool {
    !no_progress && std::io::stderr().is_terminal()
}

fn download_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸━")
}

fn unsized_download_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{prefix:.bold.cyan} {spinner:.cyan} {bytes} ({bytes_per_sec})")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"])
}

/// A ticking spinner with `message`, or a hidden one when disabled.
#[must_use]
pub fn spinner(message: impl Into<String>, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(spinner_style());
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// [`ProgressReporter`] that draws a byte-count bar.
pub struct DownloadProgress {
    label: String,
    enabled: bool,
    bar: Option<ProgressBar>,
}

impl DownloadProgress {
    pub fn new(label: impl Into<String>, enabled: bool) -> Self {
        Self {
            label: label.into(),
            enabled,
            bar: None,
        }
    }
}

impl ProgressReporter for DownloadProgress {
    fn started(&mut self, total: Option<u64>) {
        let bar = match (self.enabled, total) {
            (false, Some(total)) => ProgressBar::with_draw_target(
                Some(total),
                indicatif::ProgressDrawTarget::hidden(),
            ),
            (false, None) => ProgressBar::hidden(),
            (true, Some(total)) => {
                let bar = ProgressBar::new(total);
                bar.set_style(download_style());
                bar
            }
            (true, None) => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(unsized_download_style());
                bar
            }
        };
        bar.set_prefix(self.label.clone());
        self.bar = Some(bar);
    }

    fn advanced(&mut self, downloaded: u64) {
        if let Some(bar) = &self.bar {
            bar.set_position(downloaded);
        }
    }

    fn finished(&mut self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}
