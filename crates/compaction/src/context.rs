//! Collaborator traits
//!
//! The planner never decides on its own which directories are protected
//! or which files are eligible; those rules live behind these traits so the
//! crate can be driven by a CLI, a test, or any other front end.

use crate::types::{CompressionDecision, DirectoryDecision};
use std::path::Path;

/// Decides whether a directory may be descended into
///
/// Encodes the system/protected path denylist.
pub trait DirectoryPolicy: Sync {
    fn evaluate(&self, directory: &Path) -> DirectoryDecision;
}

/// Decides whether a single file is eligible for compression
///
/// Encodes extension denylists, minimum sizes and already-compressed checks.
pub trait FileClassifier {
    /// # Arguments
    /// * `path` - The file to classify
    /// * `thorough` - Whether slower, more accurate checks are allowed
    /// * `size` - Logical size already read from metadata
    fn classify(&self, path: &Path, thorough: bool, size: u64) -> CompressionDecision;
}

impl<F> DirectoryPolicy for F
where
    F: Fn(&Path) -> DirectoryDecision + Sync,
{
    fn evaluate(&self, directory: &Path) -> DirectoryDecision {
        self(directory)
    }
}

impl<F> FileClassifier for F
where
    F: Fn(&Path, bool, u64) -> CompressionDecision,
{
    fn classify(&self, path: &Path, thorough: bool, size: u64) -> CompressionDecision {
        self(path, thorough, size)
    }
}

/// Policy that admits every directory
pub struct AllowAll;

impl DirectoryPolicy for AllowAll {
    fn evaluate(&self, _directory: &Path) -> DirectoryDecision {
        DirectoryDecision::allow()
    }
}

/// Receives progress notifications during planning
///
/// Classification callbacks fire on the scanning thread. Entropy callbacks
/// fire from sampling workers, so implementations must synchronize any
/// state they touch. All methods default to no-ops.
pub trait PlanObserver: Sync {
    /// A file was classified; `processed` counts files seen so far
    fn on_file_classified(
        &self,
        _path: &Path,
        _processed: usize,
        _accepted: bool,
        _reason: Option<&str>,
    ) {
    }

    /// A file's metadata and decision are known
    fn on_file_observed(&self, _path: &Path, _size: u64, _decision: &CompressionDecision) {}

    /// Directory entropy sampling started for `total` directories
    fn on_entropy_start(&self, _total: usize) {}

    /// A directory finished sampling; `processed` of `total` are done
    fn on_entropy_progress(&self, _path: &Path, _processed: usize, _total: usize) {}
}

/// No-op observer
pub struct NoProgress;

impl PlanObserver for NoProgress {}
