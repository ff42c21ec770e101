//! Entropy dry run
//!
//! Samples every directory that holds eligible files and projects how much
//! the tree would shrink, without building a plan. Only directories whose
//! own share of bytes is large enough are reported, so a chain of
//! single-child directories shows up once instead of at every level.

use crate::budget::WorkerBudget;
use crate::context::{DirectoryPolicy, FileClassifier, PlanObserver};
use crate::entropy::{EntropySampler, SampleScope, SamplingConfig};
use crate::error::Result;
use crate::planner::{CompressionPlanBuilder, resolve_root};
use crate::savings::{DEFAULT_MIN_SAVINGS_PERCENT, SavingsModel, clamp_savings_percent};
use crate::skip::sample_directories_parallel;
use crate::stats::RunStats;
use crate::tree::{DirectoryTree, NodeId};
use crate::types::{DirectorySkipRecord, EntropySampleRecord, relative_to};
use crate::walker::{DirectoryWalker, WalkedFile};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Directories smaller than this are left out of the report
pub const REPORTABLE_DIRECTORY_MIN_BYTES: u64 = 5 * 1024 * 1024;

/// Verbosity at which every sample is reported and the base always sampled
const VERBOSE_REPORT_LEVEL: u8 = 4;

/// Inputs of a dry run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyseRequest {
    pub min_savings_percent: f64,
    pub verbosity: u8,
    pub sampling: SamplingConfig,
    pub savings: SavingsModel,
    pub report_threshold_bytes: u64,
}

impl Default for AnalyseRequest {
    fn default() -> Self {
        Self {
            min_savings_percent: DEFAULT_MIN_SAVINGS_PERCENT,
            verbosity: 0,
            sampling: SamplingConfig::default(),
            savings: SavingsModel::default(),
            report_threshold_bytes: REPORTABLE_DIRECTORY_MIN_BYTES,
        }
    }
}

struct RawSample {
    id: NodeId,
    average_entropy: f64,
    estimated_savings: f64,
    sampled_files: usize,
    sampled_bytes: u64,
}

/// Sample `root` and fill the entropy report fields of the returned stats
pub fn analyse_directory<P, C, O>(
    root: &Path,
    request: &AnalyseRequest,
    policy: &P,
    classifier: &C,
    budget: &WorkerBudget,
    observer: &O,
) -> Result<RunStats>
where
    P: DirectoryPolicy + ?Sized,
    C: FileClassifier + ?Sized,
    O: PlanObserver + ?Sized,
{
    let base_dir = resolve_root(root)?;
    let min_savings = clamp_savings_percent(request.min_savings_percent);
    let threshold = request.report_threshold_bytes;
    let verbose = request.verbosity >= VERBOSE_REPORT_LEVEL;

    let mut stats = RunStats::new(&base_dir, min_savings);
    stats.entropy_report_threshold_bytes = threshold;

    let root_decision = policy.evaluate(&base_dir);
    if root_decision.skip {
        let reason = root_decision
            .reason
            .unwrap_or_else(|| "excluded".to_string());
        log::warn!(
            "Dry run aborted: base directory {} is excluded ({})",
            base_dir.display(),
            reason
        );
        stats.record_directory_skip(DirectorySkipRecord::system(&base_dir, &base_dir, reason));
        return Ok(stats);
    }

    // Walk everything up front so direct byte counts are known per directory
    let mut protected_files = 0usize;
    let mut protected_bytes = 0u64;
    let mut walker = DirectoryWalker::new(&base_dir, policy, |_: &Path, size: u64| {
        protected_files += 1;
        protected_bytes += size;
    });
    let files: Vec<WalkedFile> = walker.by_ref().collect();
    for record in walker.take_directory_skips() {
        stats.record_directory_skip(record);
    }
    drop(walker);
    stats.protected_files = protected_files;
    stats.protected_bytes = protected_bytes;

    let mut direct_bytes: HashMap<PathBuf, u64> = HashMap::new();
    for file in &files {
        if let (Some(parent), Ok(size)) = (file.path.parent(), &file.size) {
            *direct_bytes.entry(parent.to_path_buf()).or_default() += size;
        }
    }

    let builder = CompressionPlanBuilder::new(classifier, observer, false);
    let eligible = builder.classify(files, &mut stats);
    stats.entropy_projected_original_bytes = stats.total_original_size;
    if eligible.is_empty() {
        log::info!("Entropy analysis skipped: no compressible files detected");
        return Ok(stats);
    }

    let tree = DirectoryTree::from_directories(&base_dir, direct_bytes.keys().map(PathBuf::as_path));

    // Every directory on the way from an eligible file up to the base
    let mut eligible_dirs: HashSet<NodeId> = HashSet::new();
    for entry in &eligible {
        let Some(id) = entry.candidate.path.parent().and_then(|p| tree.get(p)) else {
            continue;
        };
        eligible_dirs.extend(tree.ancestors(id));
    }

    let to_sample: Vec<NodeId> = tree
        .by_depth()
        .into_iter()
        .filter(|id| *id != DirectoryTree::ROOT && eligible_dirs.contains(id))
        .collect();
    let paths: Vec<PathBuf> = to_sample.iter().map(|&id| tree.path(id).to_path_buf()).collect();

    let sampler = EntropySampler::new(request.sampling);
    observer.on_entropy_start(paths.len());
    let results = sample_directories_parallel(
        &sampler,
        &paths,
        SampleScope::RECURSIVE,
        budget.entropy_workers,
        |path, _, processed, total| observer.on_entropy_progress(path, processed, total),
    )?;

    let mut raw_samples = Vec::new();
    let mut record_sample = |id: NodeId, average_entropy: f64, files: usize, bytes: u64, stats: &mut RunStats| {
        let estimated_savings = request.savings.estimate(average_entropy);
        stats.entropy_directories_sampled += 1;
        if estimated_savings < min_savings {
            stats.entropy_directories_below_threshold += 1;
        }
        if verbose {
            log::debug!(
                "Dry run sample {}: entropy {:.2} (~{:.1}% savings) from {} files ({} bytes)",
                tree.path(id).display(),
                average_entropy,
                estimated_savings,
                files,
                bytes
            );
        }
        raw_samples.push(RawSample {
            id,
            average_entropy,
            estimated_savings,
            sampled_files: files,
            sampled_bytes: bytes,
        });
    };

    for (&id, sample) in to_sample.iter().zip(results) {
        let Some(sample) = sample else { continue };
        let Some(average) = sample.average_entropy else { continue };
        if sample.sampled_files == 0 {
            continue;
        }
        record_sample(id, average, sample.sampled_files, sample.sampled_bytes, &mut stats);
    }

    let totals = tree.subtree_totals(&direct_bytes);
    let base_total = totals[DirectoryTree::ROOT];

    // The base is judged on its subdirectories' content, not its own files
    if base_total > 0 && (verbose || base_total >= threshold) {
        let sample = sampler.sample(&base_dir, SampleScope::DESCENDANTS);
        if let Some(average) = sample.average_entropy
            && sample.sampled_files > 0
        {
            record_sample(
                DirectoryTree::ROOT,
                average,
                sample.sampled_files,
                sample.sampled_bytes,
                &mut stats,
            );
        }
    }

    // Bytes of a directory not already represented by a sampled child
    let sampled: HashSet<NodeId> = raw_samples.iter().map(|s| s.id).collect();
    let residual = |id: NodeId| -> u64 {
        let own = direct_bytes.get(tree.path(id)).copied().unwrap_or(0);
        own + tree
            .children(id)
            .iter()
            .filter(|&&child| !sampled.contains(&child))
            .map(|&child| totals[child])
            .sum::<u64>()
    };

    let mut projected = base_total as f64;
    let mut reported = Vec::new();
    for sample in &raw_samples {
        let share = residual(sample.id);
        if share > 0 && sample.estimated_savings >= min_savings {
            projected -= share as f64;
            projected += share as f64 * (1.0 - sample.estimated_savings / 100.0).max(0.0);
        }

        if verbose || share >= threshold {
            let path = tree.path(sample.id);
            reported.push(EntropySampleRecord {
                path: path.to_path_buf(),
                relative_path: relative_to(path, &base_dir),
                average_entropy: sample.average_entropy,
                estimated_savings: sample.estimated_savings,
                sampled_files: sample.sampled_files,
                sampled_bytes: sample.sampled_bytes,
                total_bytes: totals[sample.id],
            });
        }
    }

    reported.sort_by(|a, b| b.estimated_savings.total_cmp(&a.estimated_savings));
    stats.entropy_samples = reported;
    stats.entropy_projected_original_bytes = base_total;
    stats.entropy_projected_compressed_bytes = projected.round().max(0.0) as u64;

    log::info!(
        "Entropy analysis complete: {} directories sampled, {} below threshold",
        stats.entropy_directories_sampled,
        stats.entropy_directories_below_threshold
    );
    Ok(stats)
}
