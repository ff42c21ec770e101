//! Error types for the compaction crate

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can abort a planning run
///
/// Everything below the run level (unreadable files, vanished entries,
/// failed probes) is recovered locally and recorded in `RunStats`.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Path does not exist
    #[error("path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// A worker pool could not be created
    #[error("failed to create worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type for compaction operations
pub type Result<T> = std::result::Result<T, Error>;
