//! Directory entropy sampling
//!
//! A directory is judged by a handful of its files: a size-weighted random
//! selection of up to `max_files`, each probed at head, middle and tail,
//! within a global byte budget. The result is a byte-weighted average in
//! bits/byte, or nothing when too little data was read to say anything.

mod probe;
mod reservoir;

pub use probe::{
    EntropyMethod, FileSample, MAX_SAMPLE_WINDOWS, TARGET_WINDOW_SIZE, byte_frequency_entropy,
    compression_probe_entropy, derive_window_size, plan_windows, sample_file,
};
pub use reservoir::WeightedReservoir;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Below this many sampled bytes a directory is not evaluable
pub const MIN_EVALUABLE_BYTES: u64 = 1024;

/// Sampling limits, shared by every directory in a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Files kept in the reservoir
    pub max_files: usize,
    /// Total bytes read per directory
    pub max_bytes: u64,
    /// Bytes read per file at most
    pub chunk_size: u64,
    pub method: EntropyMethod,
    /// Fixed seed for reproducible runs; random when absent
    pub seed: Option<u64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            max_files: 50,
            max_bytes: 4 * 1024 * 1024,
            chunk_size: 64 * 1024,
            method: EntropyMethod::CompressionProbe,
            seed: None,
        }
    }
}

/// Which files of a directory take part in sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleScope {
    pub include_subdirectories: bool,
    /// Ignore files that sit directly in the sampled directory
    pub skip_direct_files: bool,
}

impl SampleScope {
    /// The directory and everything below it
    pub const RECURSIVE: Self = Self {
        include_subdirectories: true,
        skip_direct_files: false,
    };

    /// Only files directly in the directory
    pub const DIRECT_ONLY: Self = Self {
        include_subdirectories: false,
        skip_direct_files: false,
    };

    /// Everything below the directory but not its own files
    pub const DESCENDANTS: Self = Self {
        include_subdirectories: true,
        skip_direct_files: true,
    };
}

/// Outcome of sampling one directory
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DirectorySample {
    /// `None` when fewer than [`MIN_EVALUABLE_BYTES`] were read
    pub average_entropy: Option<f64>,
    pub sampled_files: usize,
    pub sampled_bytes: u64,
}

/// Samples directories according to a [`SamplingConfig`]
#[derive(Debug, Clone, Default)]
pub struct EntropySampler {
    config: SamplingConfig,
}

impl EntropySampler {
    pub fn new(config: SamplingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Random source for sampling `directory`
    ///
    /// With a configured seed the stream depends only on the seed and the
    /// path, so results do not vary with worker scheduling.
    pub fn rng_for(&self, directory: &Path) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ path_fingerprint(directory)),
            None => StdRng::from_os_rng(),
        }
    }

    /// Sample `directory` with its own random source
    pub fn sample(&self, directory: &Path, scope: SampleScope) -> DirectorySample {
        let mut rng = self.rng_for(directory);
        self.sample_with(directory, scope, &mut rng)
    }

    /// Sample `directory` drawing randomness from `rng`
    ///
    /// Never fails: unreadable entries are skipped and logged.
    pub fn sample_with<R: Rng + ?Sized>(
        &self,
        directory: &Path,
        scope: SampleScope,
        rng: &mut R,
    ) -> DirectorySample {
        let config = &self.config;
        if config.max_files == 0 || config.max_bytes == 0 {
            return DirectorySample::default();
        }

        let (mut files, direct_files_skipped) = select_files(directory, config.max_files, scope, rng);
        let fallback = SampleScope {
            skip_direct_files: false,
            ..scope
        };

        if files.is_empty() && direct_files_skipped {
            return self.sample_with(directory, fallback, rng);
        }

        files.shuffle(rng);

        let mut sampled_files = 0;
        let mut sampled_bytes = 0u64;
        let mut weighted_entropy = 0.0;

        for path in &files {
            let remaining = config.max_bytes.saturating_sub(sampled_bytes);
            let per_file_budget = config.chunk_size.min(remaining);
            if per_file_budget == 0 {
                break;
            }

            let sample = sample_file(path, per_file_budget, config.method);
            if sample.sampled_bytes == 0 {
                continue;
            }

            sampled_files += 1;
            sampled_bytes += sample.sampled_bytes;
            weighted_entropy += sample.weighted_entropy;

            if sampled_bytes >= config.max_bytes {
                break;
            }
        }

        if sampled_bytes == 0 && direct_files_skipped {
            return self.sample_with(directory, fallback, rng);
        }

        let average_entropy = (sampled_bytes >= MIN_EVALUABLE_BYTES)
            .then(|| (weighted_entropy / sampled_bytes as f64).clamp(0.0, 8.0));

        DirectorySample {
            average_entropy,
            sampled_files,
            sampled_bytes,
        }
    }
}

/// Weighted reservoir selection over the files under `root`
///
/// Returns the selection and whether any direct file was passed over
/// because of `skip_direct_files`.
fn select_files<R: Rng + ?Sized>(
    root: &Path,
    max_files: usize,
    scope: SampleScope,
    rng: &mut R,
) -> (Vec<PathBuf>, bool) {
    let mut reservoir = WeightedReservoir::new(max_files);
    let mut direct_files_skipped = false;

    let mut walk = WalkDir::new(root);
    if !scope.include_subdirectories {
        walk = walk.max_depth(1);
    }

    let entries = walk.into_iter().filter_map(|entry| match entry {
        Ok(entry) => Some(entry),
        Err(e) => {
            log::debug!("Unable to inspect entry for entropy under {}: {}", root.display(), e);
            None
        }
    });

    for entry in entries {
        if !entry.file_type().is_file() {
            continue;
        }

        if scope.skip_direct_files && entry.depth() == 1 {
            direct_files_skipped = true;
            continue;
        }

        let size = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(_) => continue,
        };
        reservoir.offer(entry.into_path(), size, rng);
    }

    (reservoir.into_items(), direct_files_skipped)
}

/// Stable 64-bit FNV-1a over the path bytes
fn path_fingerprint(path: &Path) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    path.to_string_lossy()
        .bytes()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;
    use tempfile::TempDir;

    fn seeded() -> EntropySampler {
        EntropySampler::new(SamplingConfig {
            seed: Some(11),
            ..Default::default()
        })
    }

    fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
        let mut data = vec![0u8; len];
        StdRng::seed_from_u64(seed).fill_bytes(&mut data);
        data
    }

    #[test]
    fn test_zero_file_is_low_entropy() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("zeros.bin"), vec![0u8; 1_000_000]).unwrap();

        let sample = seeded().sample(tmp.path(), SampleScope::RECURSIVE);
        assert_eq!(sample.sampled_files, 1);
        assert!(sample.average_entropy.unwrap() < 0.1);
    }

    #[test]
    fn test_random_files_are_high_entropy() {
        let tmp = TempDir::new().unwrap();
        for i in 0..4 {
            std::fs::write(tmp.path().join(format!("r{i}.bin")), random_bytes(50_000, i)).unwrap();
        }

        let sample = seeded().sample(tmp.path(), SampleScope::RECURSIVE);
        assert_eq!(sample.sampled_files, 4);
        assert!(sample.average_entropy.unwrap() > 7.8);
    }

    #[test]
    fn test_huge_file_limit_is_harmless() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("zeros.bin"), vec![0u8; 8192]).unwrap();

        let sampler = EntropySampler::new(SamplingConfig {
            max_files: 1 << 40,
            seed: Some(5),
            ..Default::default()
        });
        let sample = sampler.sample(tmp.path(), SampleScope::RECURSIVE);
        assert_eq!(sample.sampled_files, 1);
        assert!(sample.average_entropy.is_some());
    }

    #[test]
    fn test_too_few_bytes_is_not_evaluable() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("tiny.txt"), vec![b'a'; 1023]).unwrap();

        let sample = seeded().sample(tmp.path(), SampleScope::RECURSIVE);
        assert_eq!(sample.sampled_bytes, 1023);
        assert_eq!(sample.average_entropy, None);
    }

    #[test]
    fn test_empty_files_are_ignored() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("empty"), b"").unwrap();

        let sample = seeded().sample(tmp.path(), SampleScope::RECURSIVE);
        assert_eq!(sample, DirectorySample::default());
    }

    #[test]
    fn test_direct_only_ignores_subdirectories() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("top.bin"), vec![0u8; 4096]).unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("sub").join("deep.bin"), vec![0u8; 4096]).unwrap();

        let sample = seeded().sample(tmp.path(), SampleScope::DIRECT_ONLY);
        assert_eq!(sample.sampled_files, 1);
        let sample = seeded().sample(tmp.path(), SampleScope::RECURSIVE);
        assert_eq!(sample.sampled_files, 2);
    }

    #[test]
    fn test_descendants_skip_direct_files() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("top.bin"), vec![0u8; 4096]).unwrap();
        std::fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        std::fs::write(tmp.path().join("a/b/deep.bin"), vec![0u8; 8192]).unwrap();

        let sample = seeded().sample(tmp.path(), SampleScope::DESCENDANTS);
        assert_eq!(sample.sampled_files, 1);
        assert_eq!(sample.sampled_bytes, 8192);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directories_are_not_followed() {
        let tmp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("far.bin"), vec![0u8; 4096]).unwrap();
        std::fs::write(tmp.path().join("near.bin"), vec![0u8; 2048]).unwrap();
        std::os::unix::fs::symlink(outside.path(), tmp.path().join("link")).unwrap();

        let sample = seeded().sample(tmp.path(), SampleScope::RECURSIVE);
        assert_eq!(sample.sampled_files, 1);
        assert_eq!(sample.sampled_bytes, 2048);
    }

    #[test]
    fn test_descendants_falls_back_to_direct_files() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("only.bin"), vec![0u8; 4096]).unwrap();

        let sample = seeded().sample(tmp.path(), SampleScope::DESCENDANTS);
        assert_eq!(sample.sampled_files, 1);
        assert!(sample.average_entropy.is_some());
    }

    #[test]
    fn test_byte_budget_caps_sampling() {
        let tmp = TempDir::new().unwrap();
        for i in 0..10 {
            std::fs::write(tmp.path().join(format!("f{i}")), random_bytes(100_000, i)).unwrap();
        }

        let sampler = EntropySampler::new(SamplingConfig {
            max_bytes: 100_000,
            chunk_size: 30_000,
            seed: Some(5),
            ..Default::default()
        });
        let sample = sampler.sample(tmp.path(), SampleScope::RECURSIVE);
        assert_eq!(sample.sampled_bytes, 100_000);
        assert_eq!(sample.sampled_files, 4);
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let tmp = TempDir::new().unwrap();
        for i in 0..20 {
            let mut data = random_bytes(8_000, i);
            data.extend(std::iter::repeat_n(b'x', (i as usize) * 1000));
            std::fs::write(tmp.path().join(format!("m{i}")), data).unwrap();
        }

        let sampler = EntropySampler::new(SamplingConfig {
            max_files: 5,
            seed: Some(99),
            ..Default::default()
        });
        let first = sampler.sample(tmp.path(), SampleScope::RECURSIVE);
        let second = sampler.sample(tmp.path(), SampleScope::RECURSIVE);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_directory_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        let sample = seeded().sample(&tmp.path().join("nope"), SampleScope::RECURSIVE);
        assert_eq!(sample, DirectorySample::default());
    }
}
