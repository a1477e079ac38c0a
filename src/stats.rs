//! Run statistics.
//!
//! Workers report one [`FileOutcome`] per processed file; the
//! [`StatsCollector`] folds outcomes into [`IndexingStats`] under a mutex so
//! sequential and parallel runs produce the same totals.

use std::sync::Mutex;

use serde::Serialize;

use crate::error::IndexError;

/// Counters for one indexing run.
///
/// `indexed + skipped + failed <= eligible`, with equality unless the run
/// was interrupted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexingStats {
    pub discovered: u64,
    pub eligible: u64,
    pub indexed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub bytes_indexed: u64,
    pub elapsed_ms: u64,
    pub interrupted: bool,
}

impl IndexingStats {
    /// Files that reached an outcome.
    pub fn processed(&self) -> u64 {
        self.indexed + self.skipped + self.failed
    }

    /// Same counters, ignoring timing.
    pub fn same_counts(&self, other: &IndexingStats) -> bool {
        IndexingStats {
            elapsed_ms: 0,
            ..self.clone()
        } == IndexingStats {
            elapsed_ms: 0,
            ..other.clone()
        }
    }

    /// Multi-line summary printed at the end of a run.
    pub fn render_summary(&self, project: &str) -> String {
        let mut out = String::new();
        out.push_str(&format!("Indexing summary for '{}'\n", project));
        out.push_str(&format!("  Files found:       {}\n", self.discovered));
        out.push_str(&format!(
            "  Processable files: {} ({:.1}%)\n",
            self.eligible,
            percent(self.eligible, self.discovered)
        ));
        out.push_str(&format!(
            "  Indexed files:     {} ({:.1}%)\n",
            self.indexed,
            percent(self.indexed, self.eligible)
        ));
        out.push_str(&format!("  Skipped files:     {}\n", self.skipped));
        out.push_str(&format!("  Failed files:      {}\n", self.failed));
        out.push_str(&format!(
            "  Data indexed:      {}\n",
            format_bytes(self.bytes_indexed)
        ));
        out.push_str(&format!(
            "  Elapsed:           {:.2}s\n",
            self.elapsed_ms as f64 / 1000.0
        ));
        if self.interrupted {
            out.push_str(&format!(
                "  Interrupted after {} of {} eligible files\n",
                self.processed(),
                self.eligible
            ));
        }
        out
    }
}

/// Share of `part` in `whole` as a percentage; `0.0` when `whole` is zero.
pub fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// Why an eligible file was not indexed, without being an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Content sniffing classified the file as binary.
    Binary,
    /// Content is empty after trimming whitespace.
    Empty,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Binary => "binary content",
            SkipReason::Empty => "empty",
        }
    }
}

/// Result of processing one eligible file.
#[derive(Debug)]
pub enum FileOutcome {
    Indexed { id: String, bytes: u64 },
    Skipped(SkipReason),
    Failed(IndexError),
}

/// Thread-safe accumulator shared by all workers.
#[derive(Debug, Default)]
pub struct StatsCollector {
    inner: Mutex<IndexingStats>,
}

impl StatsCollector {
    pub fn new(discovered: u64, eligible: u64) -> Self {
        Self {
            inner: Mutex::new(IndexingStats {
                discovered,
                eligible,
                ..IndexingStats::default()
            }),
        }
    }

    /// Fold one outcome in and return the updated counters.
    pub fn record(&self, outcome: &FileOutcome) -> IndexingStats {
        let mut stats = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match outcome {
            FileOutcome::Indexed { bytes, .. } => {
                stats.indexed += 1;
                stats.bytes_indexed += bytes;
            }
            FileOutcome::Skipped(_) => stats.skipped += 1,
            FileOutcome::Failed(_) => stats.failed += 1,
        }
        stats.clone()
    }

    pub fn snapshot(&self) -> IndexingStats {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Human-readable byte size (B, KB, MB, GB).
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
