//! End-to-end planning over real directory trees

use compaction::{
    AlgorithmTier, AllowAll, CompressionDecision, DirectoryDecision, FileSkipCategory,
    NoProgress, PlanObserver, PlanOutcome, PlanRequest, SamplingConfig, SkipCategory,
    WeightedReservoir, WorkerBudget, plan_directory,
};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

fn accept_all(_: &Path, _: bool, _: u64) -> CompressionDecision {
    CompressionDecision::compress()
}

fn write(path: &Path, data: Vec<u8>) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, data).unwrap();
}

fn random(len: usize, seed: u64) -> Vec<u8> {
    let mut data = vec![0u8; len];
    StdRng::seed_from_u64(seed).fill_bytes(&mut data);
    data
}

fn request(min_savings_percent: f64) -> PlanRequest {
    PlanRequest {
        min_savings_percent,
        sampling: SamplingConfig {
            seed: Some(0xc0ffee),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn plan(root: &Path, request: &PlanRequest) -> PlanOutcome {
    plan_directory(
        root,
        request,
        &AllowAll,
        &accept_all,
        &WorkerBudget::compute(2, 4, false),
        &NoProgress,
    )
    .unwrap()
}

fn planned_paths(outcome: &PlanOutcome, root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = outcome
        .plan
        .candidates()
        .iter()
        .map(|c| c.path.strip_prefix(root).unwrap().to_path_buf())
        .collect();
    paths.sort();
    paths
}

#[test]
fn zero_filled_directory_is_kept() {
    let tmp = TempDir::new().unwrap();
    write(&tmp.path().join("data/zeros.bin"), vec![0u8; 1_000_000]);

    let outcome = plan(tmp.path(), &request(50.0));

    let sample = outcome
        .stats
        .entropy_samples
        .iter()
        .find(|s| s.relative_path == "data")
        .expect("data directory should be sampled");
    assert!(sample.average_entropy < 0.1);
    assert!(sample.estimated_savings > 85.0);
    assert_eq!(sample.total_bytes, 1_000_000);

    assert!(outcome.stats.directory_skips.is_empty());
    assert_eq!(outcome.plan.len(), 1);
    assert_eq!(outcome.plan.candidates()[0].tier, AlgorithmTier::Xpress8k);
}

#[test]
fn random_directory_is_skipped() {
    let tmp = TempDir::new().unwrap();
    for i in 0..5 {
        write(&tmp.path().join(format!("random/r{i}.bin")), random(40_000, i));
    }
    write(&tmp.path().join("text/notes.txt"), b"lorem ipsum ".repeat(5_000));

    let outcome = plan(tmp.path(), &request(40.0));

    assert_eq!(outcome.stats.directory_skips.len(), 1);
    let skip = &outcome.stats.directory_skips[0];
    assert_eq!(skip.category, SkipCategory::HighEntropy);
    assert_eq!(skip.relative_path, "random");
    assert!(skip.reason.starts_with("High entropy (est. "));

    assert_eq!(planned_paths(&outcome, tmp.path()), vec![PathBuf::from("text/notes.txt")]);
    assert_eq!(outcome.stats.skipped_files, 5);
    assert_eq!(outcome.stats.skip_low_savings_files, 5);
    assert!(outcome.stats.file_skips.iter().all(|s| {
        s.category == FileSkipCategory::HighEntropy && s.reason == skip.reason
    }));
    assert_eq!(outcome.stats.entropy_directories_below_threshold, 1);
}

#[test]
fn debug_scan_all_keeps_high_entropy_files() {
    let tmp = TempDir::new().unwrap();
    for i in 0..3 {
        write(&tmp.path().join(format!("random/r{i}.bin")), random(40_000, i));
    }

    let outcome = plan(
        tmp.path(),
        &PlanRequest {
            debug_scan_all: true,
            ..request(40.0)
        },
    );

    assert_eq!(outcome.plan.len(), 3);
    assert!(outcome.stats.directory_skips.is_empty());
    assert!(outcome.stats.entropy_samples.is_empty());
    assert_eq!(outcome.stats.skipped_files, 0);
}

#[test]
fn nested_high_entropy_directories_report_once() {
    let tmp = TempDir::new().unwrap();
    write(&tmp.path().join("archive/a.bin"), random(30_000, 1));
    write(&tmp.path().join("archive/2023/b.bin"), random(30_000, 2));
    write(&tmp.path().join("archive/2023/q4/c.bin"), random(30_000, 3));
    write(&tmp.path().join("docs/readme.txt"), b"plain text ".repeat(3_000));

    let outcome = plan(tmp.path(), &request(40.0));

    let skipped: Vec<&str> = outcome
        .stats
        .directory_skips
        .iter()
        .map(|s| s.relative_path.as_str())
        .collect();
    assert_eq!(skipped, vec!["archive"]);

    let archive_reason = &outcome.stats.directory_skips[0].reason;
    assert_eq!(outcome.stats.file_skips.len(), 3);
    assert!(outcome.stats.file_skips.iter().all(|s| &s.reason == archive_reason));
    assert_eq!(planned_paths(&outcome, tmp.path()), vec![PathBuf::from("docs/readme.txt")]);
}

#[test]
fn denied_directories_never_reach_the_plan() {
    let tmp = TempDir::new().unwrap();
    write(&tmp.path().join("keep/a.txt"), vec![b'k'; 5_000]);
    write(&tmp.path().join("protected/b.txt"), vec![b'p'; 7_000]);
    write(&tmp.path().join("protected/nested/c.txt"), vec![b'p'; 11_000]);

    let policy = |dir: &Path| {
        if dir.ends_with("protected") {
            DirectoryDecision::deny("Protected directory")
        } else {
            DirectoryDecision::allow()
        }
    };
    let outcome = plan_directory(
        tmp.path(),
        &request(10.0),
        &policy,
        &accept_all,
        &WorkerBudget::single(),
        &NoProgress,
    )
    .unwrap();

    assert_eq!(planned_paths(&outcome, tmp.path()), vec![PathBuf::from("keep/a.txt")]);
    assert_eq!(outcome.stats.protected_files, 2);
    assert_eq!(outcome.stats.protected_bytes, 18_000);
    assert_eq!(outcome.stats.directory_skips.len(), 1);
    assert_eq!(outcome.stats.directory_skips[0].category, SkipCategory::System);
    assert_eq!(outcome.stats.total_original_size, 5_000);
}

#[test]
fn tiny_directories_are_not_evaluated() {
    let tmp = TempDir::new().unwrap();
    write(&tmp.path().join("tiny/r.bin"), random(1_000, 8));

    let outcome = plan(tmp.path(), &request(40.0));

    assert!(outcome.stats.entropy_samples.is_empty());
    assert!(outcome.stats.directory_skips.is_empty());
    assert_eq!(outcome.plan.len(), 1);
}

#[test]
fn out_of_range_threshold_is_clamped() {
    let tmp = TempDir::new().unwrap();
    for i in 0..2 {
        write(&tmp.path().join(format!("random/r{i}.bin")), random(20_000, i));
    }

    // A negative threshold becomes zero, which disables entropy filtering
    let outcome = plan(tmp.path(), &request(-5.0));
    assert_eq!(outcome.stats.min_savings_percent, 0.0);
    assert_eq!(outcome.plan.len(), 2);
    assert!(outcome.stats.entropy_samples.is_empty());
}

#[test]
fn observer_sees_every_file_and_directory() {
    #[derive(Default)]
    struct Counting {
        classified: AtomicUsize,
        observed: AtomicUsize,
        sampled: AtomicUsize,
        announced: AtomicUsize,
    }

    impl PlanObserver for Counting {
        fn on_file_classified(&self, _: &Path, _: usize, _: bool, _: Option<&str>) {
            self.classified.fetch_add(1, Ordering::Relaxed);
        }
        fn on_file_observed(&self, _: &Path, _: u64, _: &CompressionDecision) {
            self.observed.fetch_add(1, Ordering::Relaxed);
        }
        fn on_entropy_start(&self, total: usize) {
            self.announced.store(total, Ordering::Relaxed);
        }
        fn on_entropy_progress(&self, _: &Path, _: usize, _: usize) {
            self.sampled.fetch_add(1, Ordering::Relaxed);
        }
    }

    let tmp = TempDir::new().unwrap();
    for dir in ["a", "b", "c/d"] {
        write(&tmp.path().join(dir).join("f.txt"), vec![b'x'; 4_096]);
    }

    let observer = Counting::default();
    plan_directory(
        tmp.path(),
        &request(10.0),
        &AllowAll,
        &accept_all,
        &WorkerBudget::compute(4, 8, false),
        &observer,
    )
    .unwrap();

    assert_eq!(observer.classified.load(Ordering::Relaxed), 3);
    assert_eq!(observer.observed.load(Ordering::Relaxed), 3);
    assert_eq!(observer.announced.load(Ordering::Relaxed), 3);
    assert_eq!(observer.sampled.load(Ordering::Relaxed), 3);
}

#[test]
fn reservoir_favours_the_largest_file() {
    let mut rng = StdRng::seed_from_u64(1000);
    let mut hits = 0;

    for _ in 0..1000 {
        let mut reservoir = WeightedReservoir::new(10);
        reservoir.offer(usize::MAX, 10_000_000, &mut rng);
        for i in 0..99 {
            reservoir.offer(i, 10_000, &mut rng);
        }
        if reservoir.into_items().contains(&usize::MAX) {
            hits += 1;
        }
    }

    assert!(hits > 950, "large file picked in {hits} of 1000 runs");
}
