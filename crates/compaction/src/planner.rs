//! Plan builder - turns a file stream into a tiered compression plan

use crate::budget::WorkerBudget;
use crate::context::{DirectoryPolicy, FileClassifier, PlanObserver};
use crate::entropy::{EntropySampler, SamplingConfig};
use crate::error::{Error, Result};
use crate::savings::{DEFAULT_MIN_SAVINGS_PERCENT, SavingsModel, clamp_savings_percent};
use crate::skip::{DirectorySkipPlanner, SkipPlan};
use crate::stats::RunStats;
use crate::types::{AlgorithmTier, CompressionCandidate, FileSkipCategory};
use crate::walker::{DirectoryWalker, WalkedFile};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Ordered compression candidates
///
/// Candidates keep discovery order; [`stages`](Self::stages) groups them
/// by tier for execution without reordering within a tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionPlan {
    candidates: Vec<CompressionCandidate>,
}

/// Files of one tier, in discovery order
#[derive(Debug)]
pub struct Stage<'a> {
    pub tier: AlgorithmTier,
    pub files: Vec<&'a CompressionCandidate>,
}

impl Stage<'_> {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|c| c.size).sum()
    }
}

impl CompressionPlan {
    pub fn new(candidates: Vec<CompressionCandidate>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[CompressionCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.candidates.iter().map(|c| c.size).sum()
    }

    /// Non-empty tiers, smallest files first
    pub fn stages(&self) -> Vec<Stage<'_>> {
        AlgorithmTier::ALL
            .into_iter()
            .map(|tier| Stage {
                tier,
                files: self.candidates.iter().filter(|c| c.tier == tier).collect(),
            })
            .filter(|stage| !stage.files.is_empty())
            .collect()
    }
}

/// A classifier-approved file awaiting the entropy filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TentativeCandidate {
    /// Position in the walked stream
    pub index: usize,
    pub candidate: CompressionCandidate,
    /// Size to account for if the file ends up skipped
    pub resolved_size: u64,
}

/// Classifies walked files and applies directory skips
pub struct CompressionPlanBuilder<'a, C, O>
where
    C: FileClassifier + ?Sized,
    O: PlanObserver + ?Sized,
{
    classifier: &'a C,
    observer: &'a O,
    thorough: bool,
}

impl<'a, C, O> CompressionPlanBuilder<'a, C, O>
where
    C: FileClassifier + ?Sized,
    O: PlanObserver + ?Sized,
{
    pub fn new(classifier: &'a C, observer: &'a O, thorough: bool) -> Self {
        Self {
            classifier,
            observer,
            thorough,
        }
    }

    /// Classify every file on the calling thread
    ///
    /// Rejected files and metadata errors are recorded in `stats`; the rest
    /// come back as tentative candidates in discovery order.
    pub fn classify(
        &self,
        files: impl IntoIterator<Item = WalkedFile>,
        stats: &mut RunStats,
    ) -> Vec<TentativeCandidate> {
        let mut tentative = Vec::new();

        for (index, file) in files.into_iter().enumerate() {
            let processed = index + 1;
            let path = file.path;

            let size = match file.size {
                Ok(size) => size,
                Err(e) => {
                    let reason = format!("Error processing {}: {}", path.display(), e);
                    stats.error_files += 1;
                    stats.record_error(reason.clone());
                    stats.record_file_skip(&path, &reason, 0, 0, false, Some(FileSkipCategory::Error));
                    self.observer
                        .on_file_classified(&path, processed, false, Some(&reason));
                    continue;
                }
            };

            let decision = self.classifier.classify(&path, self.thorough, size);
            self.observer.on_file_observed(&path, size, &decision);
            stats.total_original_size += size;

            let resolved_size = decision.size_hint.filter(|&hint| hint > 0).unwrap_or(size);

            if decision.should_compress {
                self.observer.on_file_classified(&path, processed, true, None);
                tentative.push(TentativeCandidate {
                    index,
                    candidate: CompressionCandidate {
                        tier: AlgorithmTier::for_size(size),
                        path,
                        size,
                    },
                    resolved_size,
                });
                continue;
            }

            let lowered = decision.reason.to_lowercase();
            let category = lowered
                .contains("extension")
                .then_some(FileSkipCategory::Extension);
            stats.record_file_skip(
                &path,
                &decision.reason,
                resolved_size,
                size,
                lowered.contains("already compressed"),
                category,
            );
            log::debug!("Skipping {}: {}", path.display(), decision.reason);
            self.observer
                .on_file_classified(&path, processed, false, Some(&decision.reason));
        }

        tentative.sort_by_key(|t| t.index);
        tentative
    }
}

/// Drop tentative candidates covered by a skip record and build the plan
///
/// Every removal is recorded with the covering directory's reason and
/// category.
pub fn apply_skips(
    tentative: Vec<TentativeCandidate>,
    skips: &SkipPlan,
    stats: &mut RunStats,
) -> CompressionPlan {
    let mut candidates = Vec::with_capacity(tentative.len());

    for entry in tentative {
        let path = &entry.candidate.path;
        match skips.record_for(path) {
            Some(record) => {
                stats.record_file_skip(
                    path,
                    &record.reason,
                    entry.resolved_size,
                    entry.candidate.size,
                    false,
                    Some(record.category.into()),
                );
                log::debug!("Skipping {} due to {}", path.display(), record.reason);
            }
            None => candidates.push(entry.candidate),
        }
    }

    CompressionPlan::new(candidates)
}

/// Inputs of a planning run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanRequest {
    /// Allow slower, more accurate classifier checks
    pub thorough: bool,
    /// Clamped into `[0, 90]` before use
    pub min_savings_percent: f64,
    /// Keep every classifier-approved file, ignoring entropy
    pub debug_scan_all: bool,
    pub verbosity: u8,
    pub sampling: SamplingConfig,
    pub savings: SavingsModel,
}

impl Default for PlanRequest {
    fn default() -> Self {
        Self {
            thorough: false,
            min_savings_percent: DEFAULT_MIN_SAVINGS_PERCENT,
            debug_scan_all: false,
            verbosity: 0,
            sampling: SamplingConfig::default(),
            savings: SavingsModel::default(),
        }
    }
}

/// The plan and everything learned while building it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub plan: CompressionPlan,
    pub stats: RunStats,
}

/// Make `root` absolute and check it is a directory
pub(crate) fn resolve_root(root: &Path) -> Result<PathBuf> {
    let metadata = match fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::PathNotFound(root.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    if !metadata.is_dir() {
        return Err(Error::NotADirectory(root.to_path_buf()));
    }
    Ok(std::path::absolute(root)?)
}

/// Walk, classify and filter `root` into a compression plan
///
/// # Arguments
/// * `root` - Directory to plan
/// * `request` - Thresholds and modes for this run
/// * `policy` - Directory admissibility rules
/// * `classifier` - Per-file eligibility rules
/// * `budget` - Worker counts, computed once per run
/// * `observer` - Progress notifications
///
/// # Errors
/// Only an invalid root or a worker pool that cannot be created fail the
/// run; everything else ends up in the returned stats.
pub fn plan_directory<P, C, O>(
    root: &Path,
    request: &PlanRequest,
    policy: &P,
    classifier: &C,
    budget: &WorkerBudget,
    observer: &O,
) -> Result<PlanOutcome>
where
    P: DirectoryPolicy + ?Sized,
    C: FileClassifier + ?Sized,
    O: PlanObserver + ?Sized,
{
    let base_dir = resolve_root(root)?;
    let min_savings = clamp_savings_percent(request.min_savings_percent);
    let mut stats = RunStats::new(&base_dir, min_savings);

    if request.thorough {
        log::info!("Using thorough checking mode");
    }

    let mut protected_files = 0usize;
    let mut protected_bytes = 0u64;
    let mut walker = DirectoryWalker::new(&base_dir, policy, |_: &Path, size: u64| {
        protected_files += 1;
        protected_bytes += size;
    });

    let builder = CompressionPlanBuilder::new(classifier, observer, request.thorough);
    let tentative = builder.classify(walker.by_ref(), &mut stats);
    for record in walker.take_directory_skips() {
        stats.record_directory_skip(record);
    }
    drop(walker);
    stats.protected_files = protected_files;
    stats.protected_bytes = protected_bytes;

    let plan = if request.debug_scan_all {
        log::info!("Entropy filtering disabled, keeping every eligible file");
        CompressionPlan::new(tentative.into_iter().map(|t| t.candidate).collect())
    } else {
        let sampler = EntropySampler::new(request.sampling);
        let skip_planner = DirectorySkipPlanner::new(&sampler, &request.savings, budget, observer);
        let skips = skip_planner.plan(
            tentative.iter().map(|t| &t.candidate),
            &base_dir,
            min_savings,
            request.verbosity,
        )?;

        let plan = apply_skips(tentative, &skips, &mut stats);
        record_skip_plan(skips, &mut stats, min_savings);
        plan
    };

    stats.log_directory_skips(request.verbosity);
    Ok(PlanOutcome { plan, stats })
}

fn record_skip_plan(skips: SkipPlan, stats: &mut RunStats, min_savings: f64) {
    if let Some(root) = skips.root_skip {
        stats.record_directory_skip(root);
    }
    for record in skips.skips {
        stats.record_directory_skip(record);
    }

    stats.entropy_directories_sampled += skips.samples.len();
    stats.entropy_directories_below_threshold += skips
        .samples
        .iter()
        .filter(|s| s.estimated_savings < min_savings)
        .count();
    stats.entropy_samples.extend(skips.samples);
}
