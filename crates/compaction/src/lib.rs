//! # Compaction
//!
//! Entropy-guided planning for transparent filesystem compression.
//!
//! Given a directory tree, this crate decides which files are worth
//! compressing and which directories to leave alone because their content
//! is unlikely to shrink. It never compresses anything itself.
//!
//! ## Pipeline
//!
//! - **Walk**: [`DirectoryWalker`] yields files from directories the
//!   [`DirectoryPolicy`] admits, accounting for pruned bytes
//! - **Classify**: [`CompressionPlanBuilder`] asks the [`FileClassifier`]
//!   about each file and assigns an [`AlgorithmTier`]
//! - **Sample**: [`DirectorySkipPlanner`] estimates entropy per directory
//!   with an [`EntropySampler`] and turns it into savings via a
//!   [`SavingsModel`]
//! - **Filter**: candidates under skipped directories are dropped, each
//!   attributed to one directory record
//!
//! Parallel stages get their worker counts from a [`WorkerBudget`]
//! computed once per run.
//!
//! ## Example
//!
//! ```no_run
//! use compaction::{
//!     AllowAll, CompressionDecision, NoProgress, PlanRequest, SystemTopology, WorkerBudget,
//!     plan_directory,
//! };
//! use std::path::Path;
//!
//! let classifier = |_: &Path, _thorough: bool, size: u64| {
//!     if size < 4096 {
//!         CompressionDecision::skip("File too small")
//!     } else {
//!         CompressionDecision::compress()
//!     }
//! };
//! let budget = WorkerBudget::detect(&SystemTopology, false);
//!
//! let outcome = plan_directory(
//!     Path::new("/data"),
//!     &PlanRequest::default(),
//!     &AllowAll,
//!     &classifier,
//!     &budget,
//!     &NoProgress,
//! )?;
//!
//! for stage in outcome.plan.stages() {
//!     println!("{}: {} files", stage.tier, stage.files.len());
//! }
//! # Ok::<(), compaction::Error>(())
//! ```

pub mod analysis;
pub mod budget;
pub mod config;
pub mod context;
pub mod entropy;
mod error;
pub mod executor;
pub mod planner;
pub mod savings;
pub mod skip;
pub mod stats;
pub mod tree;
pub mod types;
pub mod walker;

// Re-export main types at crate root
pub use analysis::{AnalyseRequest, REPORTABLE_DIRECTORY_MIN_BYTES, analyse_directory};
pub use budget::{CpuTopology, SystemTopology, WorkerBudget};
pub use config::PlannerConfig;
pub use context::{AllowAll, DirectoryPolicy, FileClassifier, NoProgress, PlanObserver};
pub use entropy::{
    DirectorySample, EntropyMethod, EntropySampler, MIN_EVALUABLE_BYTES, SampleScope,
    SamplingConfig, WeightedReservoir,
};
pub use error::{Error, Result};
pub use executor::{
    CompressionExecutor, ExecutionResult, FileCompressor, FileOutcome, StagedExecutor,
};
pub use planner::{
    CompressionPlan, CompressionPlanBuilder, PlanOutcome, PlanRequest, Stage, TentativeCandidate,
    apply_skips, plan_directory,
};
pub use savings::{
    DEFAULT_MIN_SAVINGS_PERCENT, MAX_SAVINGS_PERCENT, SavingsModel, clamp_savings_percent,
};
pub use skip::{DirectorySkipPlanner, SkipPlan};
pub use stats::RunStats;
pub use tree::DirectoryTree;
pub use types::{
    AlgorithmTier, CompressionCandidate, CompressionDecision, DirectoryDecision,
    DirectorySkipRecord, EntropySampleRecord, FileSkipCategory, FileSkipRecord, SkipCategory,
};
pub use walker::{DirectoryWalker, WalkedFile};
