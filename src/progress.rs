//! Progress display for planning runs

use compaction::PlanObserver;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::path::Path;

use crate::Context;
use crate::ui::truncate_path;

/// Files between scan message refreshes
const SCAN_REFRESH_INTERVAL: usize = 64;

/// Spinner while scanning, bar while sampling directories
pub struct PlanProgress {
    bar: ProgressBar,
}

impl PlanProgress {
    /// Visible only on an interactive terminal with no log output competing
    pub fn new(ctx: &Context, json: bool) -> Self {
        let visible = !ctx.quiet && ctx.verbose == 0 && !json && std::io::stdout().is_terminal();
        Self::with_visibility(visible)
    }

    fn with_visibility(visible: bool) -> Self {
        let bar = if visible {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.set_message("Scanning files");
            bar
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl PlanObserver for PlanProgress {
    fn on_file_classified(
        &self,
        _path: &Path,
        processed: usize,
        _accepted: bool,
        _reason: Option<&str>,
    ) {
        if processed % SCAN_REFRESH_INTERVAL == 0 {
            self.bar.set_message(format!("Scanning files ({})", processed));
            self.bar.tick();
        }
    }

    fn on_entropy_start(&self, total: usize) {
        self.bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_message("Sampling entropy");
    }

    fn on_entropy_progress(&self, path: &Path, processed: usize, _total: usize) {
        self.bar.set_position(processed as u64);
        self.bar
            .set_message(truncate_path(&path.to_string_lossy(), 30));
    }
}
