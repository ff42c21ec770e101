//! Core value types shared by the planning stages

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Decisions
// ============================================================================

/// Verdict of a directory admissibility policy
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirectoryDecision {
    pub skip: bool,
    pub reason: Option<String>,
}

impl DirectoryDecision {
    /// Admit the directory
    pub fn allow() -> Self {
        Self::default()
    }

    /// Prune the directory with a reason
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            skip: true,
            reason: Some(reason.into()),
        }
    }
}

/// Verdict of a file classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionDecision {
    pub should_compress: bool,
    pub reason: String,
    /// Already-known on-disk size, reported for files that are compressed already
    pub size_hint: Option<u64>,
}

impl CompressionDecision {
    /// The file is a compression candidate
    pub fn compress() -> Self {
        Self {
            should_compress: true,
            reason: String::new(),
            size_hint: None,
        }
    }

    /// The file should be left alone
    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            should_compress: false,
            reason: reason.into(),
            size_hint: None,
        }
    }

    /// Attach a known on-disk size
    pub fn with_size_hint(mut self, size: u64) -> Self {
        self.size_hint = Some(size);
        self
    }
}

// ============================================================================
// Algorithm tiers
// ============================================================================

/// Compression algorithm bucket chosen from the file size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmTier {
    Xpress4k,
    Xpress8k,
    Xpress16k,
    Lzx,
}

/// Ascending size breakpoints; a file smaller than the breakpoint gets its tier.
/// Anything at or above the last breakpoint is `Lzx`.
const SIZE_BREAKPOINTS: [(u64, AlgorithmTier); 3] = [
    (64 * 1024, AlgorithmTier::Xpress4k),
    (1024 * 1024, AlgorithmTier::Xpress8k),
    (8 * 1024 * 1024, AlgorithmTier::Xpress16k),
];

impl AlgorithmTier {
    /// All tiers, smallest files first
    pub const ALL: [AlgorithmTier; 4] = [
        AlgorithmTier::Xpress4k,
        AlgorithmTier::Xpress8k,
        AlgorithmTier::Xpress16k,
        AlgorithmTier::Lzx,
    ];

    /// Pick the tier for a file of `size` bytes
    pub fn for_size(size: u64) -> Self {
        let index = SIZE_BREAKPOINTS.partition_point(|(limit, _)| *limit <= size);
        SIZE_BREAKPOINTS
            .get(index)
            .map(|(_, tier)| *tier)
            .unwrap_or(AlgorithmTier::Lzx)
    }

    /// Name of the algorithm as the platform tools spell it
    pub fn algorithm_name(&self) -> &'static str {
        match self {
            AlgorithmTier::Xpress4k => "XPRESS4K",
            AlgorithmTier::Xpress8k => "XPRESS8K",
            AlgorithmTier::Xpress16k => "XPRESS16K",
            AlgorithmTier::Lzx => "LZX",
        }
    }
}

impl fmt::Display for AlgorithmTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.algorithm_name())
    }
}

// ============================================================================
// Records
// ============================================================================

/// Why a directory was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipCategory {
    /// Denied by the admissibility policy
    System,
    /// Sampled content is unlikely to compress
    HighEntropy,
}

/// A directory excluded from compression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectorySkipRecord {
    pub path: PathBuf,
    pub relative_path: String,
    pub reason: String,
    pub category: SkipCategory,
    pub average_entropy: Option<f64>,
    pub estimated_savings: Option<f64>,
    pub sampled_files: usize,
    pub sampled_bytes: u64,
}

impl DirectorySkipRecord {
    /// Record for a directory pruned by the admissibility policy
    pub fn system(path: &Path, base: &Path, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            relative_path: relative_to(path, base),
            reason: reason.into(),
            category: SkipCategory::System,
            average_entropy: None,
            estimated_savings: None,
            sampled_files: 0,
            sampled_bytes: 0,
        }
    }

    /// Record for a directory whose sampled savings fall below the threshold
    pub fn high_entropy(sample: &EntropySampleRecord) -> Self {
        Self {
            path: sample.path.clone(),
            relative_path: sample.relative_path.clone(),
            reason: format!(
                "High entropy (est. {:.1}% savings)",
                sample.estimated_savings
            ),
            category: SkipCategory::HighEntropy,
            average_entropy: Some(sample.average_entropy),
            estimated_savings: Some(sample.estimated_savings),
            sampled_files: sample.sampled_files,
            sampled_bytes: sample.sampled_bytes,
        }
    }
}

/// Result of sampling one directory, kept for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntropySampleRecord {
    pub path: PathBuf,
    pub relative_path: String,
    /// Bits per byte in `[0, 8]`
    pub average_entropy: f64,
    /// Percent in `[0, 90]`
    pub estimated_savings: f64,
    pub sampled_files: usize,
    pub sampled_bytes: u64,
    pub total_bytes: u64,
}

/// Why a single file was left out of the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSkipCategory {
    Extension,
    AlreadyCompressed,
    HighEntropy,
    System,
    Error,
    Generic,
}

impl From<SkipCategory> for FileSkipCategory {
    fn from(category: SkipCategory) -> Self {
        match category {
            SkipCategory::System => FileSkipCategory::System,
            SkipCategory::HighEntropy => FileSkipCategory::HighEntropy,
        }
    }
}

/// A file left out of the plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSkipRecord {
    pub path: PathBuf,
    pub relative_path: String,
    pub reason: String,
    pub category: FileSkipCategory,
}

/// A file scheduled for compression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionCandidate {
    pub path: PathBuf,
    pub size: u64,
    pub tier: AlgorithmTier,
}

/// Render `path` relative to `base`, `.` for the base itself
pub fn relative_to(path: &Path, base: &Path) -> String {
    match path.strip_prefix(base) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.to_string_lossy().into_owned(),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}
