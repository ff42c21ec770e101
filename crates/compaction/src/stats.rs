//! Run-level accumulator for counters, byte totals and skip records

use crate::executor::{ExecutionResult, FileOutcome};
use crate::types::{
    DirectorySkipRecord, EntropySampleRecord, FileSkipCategory, FileSkipRecord, SkipCategory,
    relative_to,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a run learned, for reporting
///
/// Owned by the orchestrating thread. Parallel stages return values that
/// are folded in here once the stage has finished.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub base_dir: Option<PathBuf>,
    pub min_savings_percent: f64,

    pub compressed_files: usize,
    pub skipped_files: usize,
    pub already_compressed_files: usize,
    pub error_files: usize,

    /// Logical bytes of every classified file
    pub total_original_size: u64,
    /// On-disk bytes after compression, plus resolved sizes of skipped files
    pub total_compressed_size: u64,
    pub total_skipped_size: u64,

    /// Files below directories the policy denied
    pub protected_files: usize,
    pub protected_bytes: u64,

    pub skip_extension_files: usize,
    pub skip_low_savings_files: usize,

    pub errors: Vec<String>,
    pub directory_skips: Vec<DirectorySkipRecord>,
    pub entropy_samples: Vec<EntropySampleRecord>,
    pub file_skips: Vec<FileSkipRecord>,

    pub entropy_directories_sampled: usize,
    pub entropy_directories_below_threshold: usize,
    pub entropy_report_threshold_bytes: u64,
    pub entropy_projected_original_bytes: u64,
    pub entropy_projected_compressed_bytes: u64,
}

impl RunStats {
    pub fn new(base_dir: &Path, min_savings_percent: f64) -> Self {
        Self {
            base_dir: Some(base_dir.to_path_buf()),
            min_savings_percent,
            ..Default::default()
        }
    }

    /// Record a file left out of the plan
    ///
    /// `size_hint` is the resolved on-disk size when known; zero falls back
    /// to `original_size`. The category is resolved in priority order:
    /// already compressed, then the explicit category, then keywords in
    /// the reason.
    pub fn record_file_skip(
        &mut self,
        path: &Path,
        reason: &str,
        size_hint: u64,
        original_size: u64,
        already_compressed: bool,
        category: Option<FileSkipCategory>,
    ) {
        let resolved_hint = if size_hint > 0 { size_hint } else { original_size };
        self.skipped_files += 1;
        self.total_compressed_size += resolved_hint;
        self.total_skipped_size += original_size;
        if already_compressed {
            self.already_compressed_files += 1;
        }

        let category = resolve_skip_category(reason, already_compressed, category);
        match category {
            FileSkipCategory::Extension => self.skip_extension_files += 1,
            FileSkipCategory::HighEntropy => self.skip_low_savings_files += 1,
            _ => {}
        }

        self.file_skips.push(FileSkipRecord {
            path: path.to_path_buf(),
            relative_path: self.relative(path),
            reason: reason.to_string(),
            category,
        });
    }

    pub fn record_compressed(&mut self, original_size: u64, compressed_size: u64) {
        self.compressed_files += 1;
        self.total_compressed_size += compressed_size;
        log::trace!(
            "Compressed {} -> {} bytes",
            original_size,
            compressed_size
        );
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::error!("{}", message);
        self.errors.push(message);
    }

    pub fn record_directory_skip(&mut self, record: DirectorySkipRecord) {
        match record.category {
            SkipCategory::System => log::debug!(
                "Skipping system directory {}: {}",
                record.path.display(),
                record.reason
            ),
            SkipCategory::HighEntropy => log::debug!(
                "Skipping high entropy directory {}: {}",
                record.path.display(),
                record.reason
            ),
        }
        self.directory_skips.push(record);
    }

    /// Fold executor outcomes in, after every stage has finished
    pub fn apply_execution(&mut self, result: &ExecutionResult) {
        for outcome in &result.outcomes {
            match outcome {
                FileOutcome::Compressed {
                    original_size,
                    compressed_size,
                    ..
                } => self.record_compressed(*original_size, *compressed_size),
                FileOutcome::Failed { path, error, .. } => {
                    self.error_files += 1;
                    self.record_error(format!("Error compressing {}: {}", path.display(), error));
                }
            }
        }
    }

    /// Bytes freed, compared with the logical size of everything seen
    pub fn space_saved(&self) -> u64 {
        self.total_original_size
            .saturating_sub(self.total_compressed_size)
    }

    pub fn savings_percent(&self) -> f64 {
        if self.total_original_size == 0 {
            0.0
        } else {
            self.space_saved() as f64 / self.total_original_size as f64 * 100.0
        }
    }

    pub fn directory_skips_in(&self, category: SkipCategory) -> impl Iterator<Item = &DirectorySkipRecord> {
        self.directory_skips
            .iter()
            .filter(move |record| record.category == category)
    }

    /// Summarise directory skips in the log
    ///
    /// High-entropy skips from verbosity 1, protected directories from 4.
    pub fn log_directory_skips(&self, verbosity: u8) {
        if verbosity < 1 {
            return;
        }

        let entropy: Vec<_> = self.directory_skips_in(SkipCategory::HighEntropy).collect();
        if !entropy.is_empty() {
            log::info!(
                "Skipped {} directories due to low expected savings (<{:.1}%):",
                entropy.len(),
                self.min_savings_percent
            );
            for record in entropy {
                log::info!(
                    " - {} - {} (~{:.1}% savings, entropy {:.2}, {} files)",
                    record.relative_path,
                    record.reason,
                    record.estimated_savings.unwrap_or(0.0),
                    record.average_entropy.unwrap_or(0.0),
                    record.sampled_files
                );
            }
        }

        if verbosity >= 4 {
            let system: Vec<_> = self.directory_skips_in(SkipCategory::System).collect();
            if !system.is_empty() {
                log::info!("Skipped {} protected directories:", system.len());
                for record in system {
                    log::info!(" - {} - {}", record.relative_path, record.reason);
                }
            }
        }
    }

    fn relative(&self, path: &Path) -> String {
        match &self.base_dir {
            Some(base) => relative_to(path, base),
            None => path.to_string_lossy().into_owned(),
        }
    }
}

fn resolve_skip_category(
    reason: &str,
    already_compressed: bool,
    category: Option<FileSkipCategory>,
) -> FileSkipCategory {
    if already_compressed {
        return FileSkipCategory::AlreadyCompressed;
    }
    if let Some(category) = category {
        return category;
    }

    let lowered = reason.to_lowercase();
    if lowered.contains("extension") {
        FileSkipCategory::Extension
    } else if lowered.contains("high entropy") || lowered.contains("savings") {
        FileSkipCategory::HighEntropy
    } else {
        FileSkipCategory::Generic
    }
}
