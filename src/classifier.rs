//! Per-file eligibility rules

use compaction::{CompressionDecision, FileClassifier};
use std::collections::HashSet;
use std::path::Path;

use crate::config::ClassifierConfig;

/// Formats that are already compressed, matched case-insensitively
const SKIPPED_EXTENSIONS: &[&str] = &[
    // Archives
    "7z", "zip", "rar", "gz", "tgz", "bz2", "xz", "zst", "lz4", "cab", "lzma",
    // Images
    "jpg", "jpeg", "png", "gif", "webp", "heic", "avif",
    // Audio and video
    "mp3", "aac", "ogg", "opus", "flac", "m4a", "mp4", "mkv", "avi", "mov", "webm",
    // Packages
    "jar", "apk", "msi", "whl", "nupkg", "docx", "xlsx", "pptx",
];

/// Files allocating less than this share of their length are already compressed
const ALLOCATION_RATIO: f64 = 0.9;

/// Extension denylist, minimum size, and an allocated-size check
pub struct DefaultClassifier {
    extensions: HashSet<String>,
    min_file_size: u64,
}

impl DefaultClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        let extensions = SKIPPED_EXTENSIONS
            .iter()
            .map(|ext| (*ext).to_string())
            .chain(
                config
                    .skip_extensions
                    .iter()
                    .map(|ext| ext.trim_start_matches('.').to_lowercase()),
            )
            .collect();

        Self {
            extensions,
            min_file_size: config.min_file_size,
        }
    }
}

impl FileClassifier for DefaultClassifier {
    fn classify(&self, path: &Path, thorough: bool, size: u64) -> CompressionDecision {
        if let Some(ext) = path.extension() {
            let ext = ext.to_string_lossy().to_lowercase();
            if self.extensions.contains(&ext) {
                return CompressionDecision::skip(format!("Skipped extension .{}", ext));
            }
        }

        if size < self.min_file_size {
            return CompressionDecision::skip("File too small");
        }

        if thorough
            && let Some(allocated) = allocated_size(path)
            && looks_compressed(size, allocated)
        {
            return CompressionDecision::skip("Already compressed").with_size_hint(allocated);
        }

        CompressionDecision::compress()
    }
}

fn looks_compressed(size: u64, allocated: u64) -> bool {
    size > 0 && (allocated as f64) < size as f64 * ALLOCATION_RATIO
}

#[cfg(unix)]
fn allocated_size(path: &Path) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;

    match std::fs::metadata(path) {
        Ok(meta) => Some(meta.blocks() * 512),
        Err(e) => {
            log::debug!("Could not read allocation of {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(not(unix))]
fn allocated_size(_path: &Path) -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn classifier() -> DefaultClassifier {
        DefaultClassifier::new(&ClassifierConfig {
            skip_extensions: vec![".ISO".to_string()],
            min_file_size: 4096,
        })
    }

    #[test]
    fn test_skipped_extensions() {
        let classifier = classifier();

        let decision = classifier.classify(Path::new("/d/movie.MKV"), false, 1 << 20);
        assert!(!decision.should_compress);
        assert_eq!(decision.reason, "Skipped extension .mkv");

        let decision = classifier.classify(Path::new("/d/disk.iso"), false, 1 << 20);
        assert!(!decision.should_compress);
    }

    #[test]
    fn test_small_files_are_skipped() {
        let decision = classifier().classify(Path::new("/d/a.txt"), false, 100);
        assert!(!decision.should_compress);
        assert_eq!(decision.reason, "File too small");
    }

    #[test]
    fn test_plain_files_are_accepted() {
        let decision = classifier().classify(Path::new("/d/log.txt"), false, 1 << 20);
        assert!(decision.should_compress);
        assert!(decision.size_hint.is_none());
    }

    #[test]
    fn test_allocation_ratio() {
        assert!(looks_compressed(100_000, 40_000));
        assert!(!looks_compressed(100_000, 98_304));
        assert!(!looks_compressed(0, 0));
    }

    #[test]
    fn test_thorough_tolerates_unreadable_metadata() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gone.log");

        let decision = classifier().classify(&path, true, 64 * 1024);
        assert!(decision.should_compress);
    }
}
