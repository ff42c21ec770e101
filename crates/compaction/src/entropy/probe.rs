//! Per-file entropy estimation over a few sampled windows

use flate2::Compression;
use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Windows read from one file: head, middle and tail
pub const MAX_SAMPLE_WINDOWS: u64 = 3;

/// Preferred window length
pub const TARGET_WINDOW_SIZE: u64 = 16 * 1024;

/// zlib effort for the probe; low levels track real filesystem compressors well
const PROBE_LEVEL: u32 = 2;

/// How a window of bytes is turned into bits/byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntropyMethod {
    /// Compress the window and scale the achieved ratio to `[0, 8]`
    #[default]
    CompressionProbe,
    /// Shannon entropy of the byte histogram
    ByteFrequency,
}

impl EntropyMethod {
    /// Bits per byte for one window, `None` when the estimate failed
    pub fn estimate(self, window: &[u8]) -> Option<f64> {
        match self {
            EntropyMethod::CompressionProbe => compression_probe_entropy(window).ok(),
            EntropyMethod::ByteFrequency => Some(byte_frequency_entropy(window)),
        }
    }
}

/// Entropy contribution of one file
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FileSample {
    /// Sum of `entropy * bytes` across windows
    pub weighted_entropy: f64,
    pub sampled_bytes: u64,
}

/// Window length for a per-file byte budget
pub fn derive_window_size(byte_budget: u64) -> u64 {
    if byte_budget == 0 {
        return 0;
    }
    let mut window = TARGET_WINDOW_SIZE.min(byte_budget);
    if window * MAX_SAMPLE_WINDOWS > byte_budget && byte_budget >= MAX_SAMPLE_WINDOWS {
        window = byte_budget / MAX_SAMPLE_WINDOWS;
    }
    window.max(1)
}

/// `(offset, length)` windows at head, middle and tail, clamped and de-duplicated
pub fn plan_windows(file_size: u64, window_size: u64) -> Vec<(u64, u64)> {
    if file_size == 0 || window_size == 0 {
        return Vec::new();
    }
    if file_size <= window_size {
        return vec![(0, file_size)];
    }

    let mut raw = vec![(0, window_size)];
    if file_size <= 2 * window_size {
        raw.push((file_size - window_size, window_size));
    } else {
        let middle = (file_size / 2).saturating_sub(window_size / 2);
        raw.push((middle, window_size));
        raw.push((file_size - window_size, window_size));
    }

    let mut windows: Vec<(u64, u64)> = Vec::with_capacity(raw.len());
    for (offset, length) in raw.into_iter().take(MAX_SAMPLE_WINDOWS as usize) {
        let offset = offset.min(file_size - length);
        let length = length.min(file_size - offset);
        if length == 0 || windows.contains(&(offset, length)) {
            continue;
        }
        windows.push((offset, length));
    }
    windows
}

/// Sample one file within `byte_budget` bytes
///
/// IO errors yield an empty sample; the caller simply moves on.
pub fn sample_file(path: &Path, byte_budget: u64, method: EntropyMethod) -> FileSample {
    match try_sample_file(path, byte_budget, method) {
        Ok(sample) => sample,
        Err(e) => {
            log::debug!("Unable to sample {} for entropy: {}", path.display(), e);
            FileSample::default()
        }
    }
}

fn try_sample_file(path: &Path, byte_budget: u64, method: EntropyMethod) -> io::Result<FileSample> {
    if byte_budget == 0 {
        return Ok(FileSample::default());
    }

    let mut file = File::open(path)?;
    let file_size = file.metadata()?.len();
    let windows = plan_windows(file_size, derive_window_size(byte_budget));

    let mut sample = FileSample::default();
    let mut buffer = Vec::new();

    for (offset, length) in windows {
        let remaining = byte_budget.saturating_sub(sample.sampled_bytes);
        let read_len = length.min(remaining);
        if read_len == 0 {
            break;
        }

        file.seek(SeekFrom::Start(offset))?;
        buffer.clear();
        (&mut file).take(read_len).read_to_end(&mut buffer)?;
        if buffer.is_empty() {
            continue;
        }

        let Some(entropy) = method.estimate(&buffer) else {
            log::debug!(
                "Entropy probe failed for {} at offset {}",
                path.display(),
                offset
            );
            continue;
        };
        let bytes = buffer.len() as u64;
        sample.weighted_entropy += entropy * bytes as f64;
        sample.sampled_bytes += bytes;
    }

    Ok(sample)
}

/// Bits/byte implied by a fast zlib pass over `sample`
pub fn compression_probe_entropy(sample: &[u8]) -> io::Result<f64> {
    if sample.is_empty() {
        return Ok(0.0);
    }

    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(sample.len() / 2),
        Compression::new(PROBE_LEVEL),
    );
    encoder.write_all(sample)?;
    let compressed = encoder.finish()?;

    let ratio = compressed.len().max(1) as f64 / sample.len() as f64;
    Ok((ratio * 8.0).clamp(0.0, 8.0))
}

/// Shannon entropy of the byte histogram, in bits/byte
pub fn byte_frequency_entropy(sample: &[u8]) -> f64 {
    if sample.is_empty() {
        return 0.0;
    }

    let mut counts = [0u64; 256];
    for &byte in sample {
        counts[byte as usize] += 1;
    }

    let total = sample.len() as f64;
    counts
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}
