//! Binary-content heuristics.
//!
//! Two checks, cheapest first: [`has_binary_extension`] rejects well-known
//! binary formats by name alone, and [`sniff_file`] samples the leading bytes
//! of everything else. Both fail safe: anything that cannot be inspected is
//! treated as binary and left out of the index.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

/// Extensions (lowercase, no dot) that are always binary.
pub const BINARY_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "bmp", "tiff", "webp", "ico", "svg",
    // audio / video
    "mp3", "wav", "ogg", "mp4", "avi", "mov", "mkv", "flv", "webm",
    // documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
    // archives
    "zip", "tar", "gz", "rar", "7z", "jar", "war",
    // compiled objects
    "exe", "dll", "so", "class", "pyc", "pyo", "o", "a", "lib", "bin",
    // databases
    "dat", "db", "sqlite", "sqlite3",
];

/// Tunables for [`looks_binary`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct BinaryThresholds {
    /// Leading bytes read from each file.
    pub sample_bytes: usize,
    /// Fraction of non-text bytes above which a sample is binary.
    pub max_non_text_ratio: f64,
    /// Samples this short or shorter are never judged by ratio.
    pub min_sample_len: usize,
}

impl Default for BinaryThresholds {
    fn default() -> Self {
        Self {
            sample_bytes: 4096,
            max_non_text_ratio: 0.30,
            min_sample_len: 50,
        }
    }
}

pub fn has_binary_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| BINARY_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Classify a byte sample.
///
/// Empty is text. Any NUL is binary. Otherwise a sample longer than
/// `min_sample_len` is binary when the share of bytes below TAB or above `~`
/// exceeds `max_non_text_ratio`.
pub fn looks_binary(sample: &[u8], thresholds: &BinaryThresholds) -> bool {
    if sample.is_empty() {
        return false;
    }
    if sample.contains(&0) {
        return true;
    }
    if sample.len() <= thresholds.min_sample_len {
        return false;
    }

    let non_text = sample
        .iter()
        .filter(|&&b| !(9..=126).contains(&b))
        .count();
    (non_text as f64 / sample.len() as f64) > thresholds.max_non_text_ratio
}

/// Sample the head of `path` and classify it. I/O errors count as binary.
pub fn sniff_file(path: &Path, thresholds: &BinaryThresholds) -> bool {
    match read_sample(path, thresholds.sample_bytes) {
        Ok(sample) => looks_binary(&sample, thresholds),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "could not sample file, treating as binary");
            true
        }
    }
}

fn read_sample(path: &Path, limit: usize) -> std::io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut sample = Vec::with_capacity(limit.min(64 * 1024));
    file.take(limit as u64).read_to_end(&mut sample)?;
    Ok(sample)
}
