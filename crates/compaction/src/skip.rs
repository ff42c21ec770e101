//! Entropy-driven directory skips
//!
//! Every directory that holds a tentative candidate is sampled, in
//! parallel, and compared against the savings threshold. A skipped
//! directory then dominates all of its descendants: their own verdicts are
//! still computed but never reported, so each excluded file is attributed
//! to exactly one directory.

use crate::budget::WorkerBudget;
use crate::context::PlanObserver;
use crate::entropy::{DirectorySample, EntropySampler, SampleScope};
use crate::error::Result;
use crate::savings::SavingsModel;
use crate::tree::{DirectoryTree, NodeId};
use crate::types::{CompressionCandidate, DirectorySkipRecord, EntropySampleRecord, relative_to};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Sample `directories` on a dedicated pool of `workers` threads
///
/// Results line up with the input; `None` marks a task that panicked.
/// `on_sampled(path, sample, processed, total)` fires from the worker that
/// finished the directory.
pub fn sample_directories_parallel<F>(
    sampler: &EntropySampler,
    directories: &[PathBuf],
    scope: SampleScope,
    workers: usize,
    on_sampled: F,
) -> Result<Vec<Option<DirectorySample>>>
where
    F: Fn(&Path, Option<&DirectorySample>, usize, usize) + Sync,
{
    sample_each_parallel(
        directories,
        workers,
        |directory| sampler.sample(directory, scope),
        on_sampled,
    )
}

/// Run `sample` over every directory, turning a panicking task into `None`
fn sample_each_parallel<T, S, F>(
    directories: &[PathBuf],
    workers: usize,
    sample: S,
    on_sampled: F,
) -> Result<Vec<Option<T>>>
where
    T: Send,
    S: Fn(&Path) -> T + Sync,
    F: Fn(&Path, Option<&T>, usize, usize) + Sync,
{
    if directories.is_empty() {
        return Ok(Vec::new());
    }

    let total = directories.len();
    let processed = AtomicUsize::new(0);
    let run = |directory: &PathBuf| {
        let result = panic::catch_unwind(AssertUnwindSafe(|| sample(directory)));
        let result = match result {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Entropy sampling failed for {}", directory.display());
                None
            }
        };
        let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
        on_sampled(directory.as_path(), result.as_ref(), done, total);
        result
    };

    let workers = workers.max(1);
    if workers == 1 || total == 1 {
        return Ok(directories.iter().map(run).collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("entropy-{i}"))
        .build()?;
    Ok(pool.install(|| directories.par_iter().map(run).collect()))
}

/// Deduplicated skip decisions for one planning pass
pub struct SkipPlan {
    /// Skipped directories below the base, shallowest first
    pub skips: Vec<DirectorySkipRecord>,
    /// Covers only files sitting directly in the base directory
    pub root_skip: Option<DirectorySkipRecord>,
    /// Every successful sample, skipped or not
    pub samples: Vec<EntropySampleRecord>,
    base_dir: PathBuf,
    tree: DirectoryTree,
    /// Index into `skips` of the record covering each tree node
    covering: Vec<Option<usize>>,
}

impl SkipPlan {
    /// A plan that skips nothing
    pub fn empty(base_dir: &Path) -> Self {
        Self {
            skips: Vec::new(),
            root_skip: None,
            samples: Vec::new(),
            base_dir: base_dir.to_path_buf(),
            tree: DirectoryTree::new(base_dir),
            covering: vec![None],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.skips.is_empty() && self.root_skip.is_none()
    }

    /// The record that excludes `file`, if any
    ///
    /// Files directly in the base answer to the root record; everything
    /// else to its nearest skipped ancestor below the base.
    pub fn record_for(&self, file: &Path) -> Option<&DirectorySkipRecord> {
        let parent = file.parent()?;
        if parent == self.base_dir {
            return self.root_skip.as_ref();
        }

        let id = parent.ancestors().find_map(|dir| self.tree.get(dir))?;
        if id == DirectoryTree::ROOT {
            return None;
        }
        self.covering[id].map(|index| &self.skips[index])
    }
}

/// Samples candidate directories and decides which to skip
pub struct DirectorySkipPlanner<'a, O: PlanObserver + ?Sized> {
    sampler: &'a EntropySampler,
    savings: &'a SavingsModel,
    budget: &'a WorkerBudget,
    observer: &'a O,
}

impl<'a, O: PlanObserver + ?Sized> DirectorySkipPlanner<'a, O> {
    pub fn new(
        sampler: &'a EntropySampler,
        savings: &'a SavingsModel,
        budget: &'a WorkerBudget,
        observer: &'a O,
    ) -> Self {
        Self {
            sampler,
            savings,
            budget,
            observer,
        }
    }

    /// Evaluate the directories holding `candidates`
    ///
    /// Nothing is sampled when the threshold is zero or there are no
    /// candidates.
    pub fn plan<'c>(
        &self,
        candidates: impl IntoIterator<Item = &'c CompressionCandidate>,
        base_dir: &Path,
        min_savings_percent: f64,
        verbosity: u8,
    ) -> Result<SkipPlan> {
        let mut plan = SkipPlan::empty(base_dir);
        if min_savings_percent <= 0.0 {
            return Ok(plan);
        }

        let mut direct_bytes: HashMap<PathBuf, u64> = HashMap::new();
        for candidate in candidates {
            if let Some(parent) = candidate.path.parent() {
                *direct_bytes.entry(parent.to_path_buf()).or_default() += candidate.size;
            }
        }
        if direct_bytes.is_empty() {
            return Ok(plan);
        }

        let tree = DirectoryTree::from_directories(base_dir, direct_bytes.keys().map(PathBuf::as_path));
        let totals = tree.subtree_totals(&direct_bytes);

        // Base first, on its direct files only
        if direct_bytes.contains_key(base_dir) {
            let sample = self.sampler.sample(base_dir, SampleScope::DIRECT_ONLY);
            let base_bytes = direct_bytes.get(base_dir).copied().unwrap_or(0);
            if let Some(record) = self.sample_record(base_dir, base_dir, &sample, base_bytes) {
                log::debug!(
                    "Root entropy sample for {}: {:.2} bits/byte (~{:.1}% savings) across {} files ({} bytes)",
                    base_dir.display(),
                    record.average_entropy,
                    record.estimated_savings,
                    record.sampled_files,
                    record.sampled_bytes
                );
                if record.estimated_savings < min_savings_percent {
                    if verbosity >= 2 {
                        log::info!(
                            "Skipping root-level files; estimated savings {:.1}% is below threshold {:.1}%",
                            record.estimated_savings,
                            min_savings_percent
                        );
                    }
                    plan.root_skip = Some(DirectorySkipRecord::high_entropy(&record));
                }
                plan.samples.push(record);
            }
        }

        // Every other directory holding candidates, recursively and in parallel
        let directories: Vec<PathBuf> = direct_bytes
            .keys()
            .filter(|dir| dir.as_path() != base_dir)
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        self.observer.on_entropy_start(directories.len());
        let results = sample_directories_parallel(
            self.sampler,
            &directories,
            SampleScope::RECURSIVE,
            self.budget.entropy_workers,
            |path, _, processed, total| self.observer.on_entropy_progress(path, processed, total),
        )?;

        let mut own_skips: HashMap<NodeId, DirectorySkipRecord> = HashMap::new();
        for (directory, sample) in directories.iter().zip(results) {
            let Some(sample) = sample else { continue };
            let Some(id) = tree.get(directory) else { continue };
            let Some(record) = self.sample_record(directory, base_dir, &sample, totals[id]) else {
                continue;
            };

            log::debug!(
                "Entropy sample for {}: {:.2} bits/byte (~{:.1}% savings) across {} files ({} bytes)",
                directory.display(),
                record.average_entropy,
                record.estimated_savings,
                record.sampled_files,
                record.sampled_bytes
            );
            if record.estimated_savings < min_savings_percent {
                if verbosity >= 1 {
                    log::info!(
                        "Skipping directory {}; estimated savings {:.1}% is below threshold {:.1}%",
                        directory.display(),
                        record.estimated_savings,
                        min_savings_percent
                    );
                }
                own_skips.insert(id, DirectorySkipRecord::high_entropy(&record));
            }
            plan.samples.push(record);
        }

        // Ancestor dominance: parents are resolved before their children.
        // The base never dominates, its record only covers direct files.
        let mut covering = vec![None; tree.len()];
        for id in tree.by_depth() {
            let inherited = match tree.parent(id) {
                Some(parent) if parent != DirectoryTree::ROOT => covering[parent],
                _ => None,
            };
            covering[id] = match inherited {
                Some(index) => Some(index),
                None => own_skips.remove(&id).map(|record| {
                    plan.skips.push(record);
                    plan.skips.len() - 1
                }),
            };
        }

        plan.tree = tree;
        plan.covering = covering;
        Ok(plan)
    }

    fn sample_record(
        &self,
        directory: &Path,
        base_dir: &Path,
        sample: &DirectorySample,
        total_bytes: u64,
    ) -> Option<EntropySampleRecord> {
        let average_entropy = sample.average_entropy?;
        if sample.sampled_files == 0 {
            return None;
        }
        Some(EntropySampleRecord {
            path: directory.to_path_buf(),
            relative_path: relative_to(directory, base_dir),
            average_entropy,
            estimated_savings: self.savings.estimate(average_entropy),
            sampled_files: sample.sampled_files,
            sampled_bytes: sample.sampled_bytes,
            total_bytes,
        })
    }
}
