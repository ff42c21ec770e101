//! Staged execution of a compression plan
//!
//! The planner never compresses anything itself. A [`CompressionExecutor`]
//! takes the finished plan and runs it tier by tier; [`StagedExecutor`] does
//! so with one bounded worker pool per tier, delegating the actual work on a
//! file to a [`FileCompressor`].

use crate::budget::WorkerBudget;
use crate::error::Result;
use crate::planner::CompressionPlan;
use crate::types::AlgorithmTier;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// The platform compression primitive for a single file
pub trait FileCompressor: Sync {
    /// Compress `path` with the tier's algorithm, returning the on-disk size afterwards
    fn compress(&self, path: &Path, tier: AlgorithmTier) -> io::Result<u64>;
}

impl<F> FileCompressor for F
where
    F: Fn(&Path, AlgorithmTier) -> io::Result<u64> + Sync,
{
    fn compress(&self, path: &Path, tier: AlgorithmTier) -> io::Result<u64> {
        self(path, tier)
    }
}

/// Called on the calling thread when a tier starts, with its file count
pub type StageCallback<'a> = &'a dyn Fn(AlgorithmTier, usize);

/// Called from worker threads after each file
pub type FileProgressCallback<'a> = &'a (dyn Fn(&Path, AlgorithmTier) + Sync);

/// Runs a plan
pub trait CompressionExecutor {
    fn execute(
        &self,
        plan: &CompressionPlan,
        stage_callback: StageCallback<'_>,
        progress_callback: FileProgressCallback<'_>,
    ) -> Result<ExecutionResult>;
}

/// What happened to one planned file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Compressed {
        path: PathBuf,
        tier: AlgorithmTier,
        original_size: u64,
        compressed_size: u64,
    },
    Failed {
        path: PathBuf,
        tier: AlgorithmTier,
        error: String,
    },
}

impl FileOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Compressed { path, .. } | Self::Failed { path, .. } => path,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Compressed { .. })
    }
}

/// Outcomes of a whole run, stage by stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub outcomes: Vec<FileOutcome>,
}

impl ExecutionResult {
    pub fn compressed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.compressed()
    }
}

/// Executes each tier in its own pool sized by the [`WorkerBudget`]
pub struct StagedExecutor<C: FileCompressor> {
    compressor: C,
    budget: WorkerBudget,
}

impl<C: FileCompressor> StagedExecutor<C> {
    pub fn new(compressor: C, budget: WorkerBudget) -> Self {
        Self { compressor, budget }
    }
}

impl<C: FileCompressor> CompressionExecutor for StagedExecutor<C> {
    fn execute(
        &self,
        plan: &CompressionPlan,
        stage_callback: StageCallback<'_>,
        progress_callback: FileProgressCallback<'_>,
    ) -> Result<ExecutionResult> {
        let mut result = ExecutionResult::default();

        for stage in plan.stages() {
            let workers = self.budget.execution_workers(stage.tier);
            stage_callback(stage.tier, stage.files.len());
            log::debug!(
                "Compressing {} files with {} using {} workers",
                stage.files.len(),
                stage.tier,
                workers
            );

            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("compact-{i}"))
                .build()?;

            let outcomes: Vec<FileOutcome> = pool.install(|| {
                stage
                    .files
                    .par_iter()
                    .map(|candidate| {
                        let outcome = match self.compressor.compress(&candidate.path, stage.tier) {
                            Ok(compressed_size) => FileOutcome::Compressed {
                                path: candidate.path.clone(),
                                tier: stage.tier,
                                original_size: candidate.size,
                                compressed_size,
                            },
                            Err(e) => FileOutcome::Failed {
                                path: candidate.path.clone(),
                                tier: stage.tier,
                                error: e.to_string(),
                            },
                        };
                        progress_callback(&candidate.path, stage.tier);
                        outcome
                    })
                    .collect()
            });

            result.outcomes.extend(outcomes);
        }

        Ok(result)
    }
}
