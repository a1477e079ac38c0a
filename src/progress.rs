//! Indexing progress reporting.
//!
//! Reports observable progress while a project is indexed so users see what
//! is being scanned, how much is left, and how many files made it in.
//! Progress is emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;
use std::sync::Arc;

/// A single progress event for an indexing run.
#[derive(Clone, Debug, PartialEq)]
pub enum IndexProgressEvent {
    /// Walking the project tree. Total unknown.
    Discovering { project: String },
    /// Walk and filtering done.
    Discovered {
        project: String,
        discovered: u64,
        eligible: u64,
    },
    /// One more file reached an outcome: `n` of `total` processed.
    Indexing {
        project: String,
        n: u64,
        total: u64,
        indexed: u64,
        path: String,
    },
    Finished {
        project: String,
        indexed: u64,
        total: u64,
        interrupted: bool,
    },
}

/// Reports indexing progress. Implementations write to stderr (human or JSON).
pub trait IndexProgressReporter: Send + Sync {
    /// Emit a progress event. Called from pipeline workers.
    fn report(&self, event: IndexProgressEvent);
}

/// Human-friendly progress on stderr: "index demo  indexing  12 / 340 files  (11 indexed, 3.5%)  src/lib.rs".
pub struct StderrProgress;

impl StderrProgress {
    fn line(event: &IndexProgressEvent) -> String {
        match event {
            IndexProgressEvent::Discovering { project } => {
                format!("index {}  discovering...\n", project)
            }
            IndexProgressEvent::Discovered {
                project,
                discovered,
                eligible,
            } => format!(
                "index {}  found {} files, {} eligible\n",
                project,
                format_number(*discovered),
                format_number(*eligible)
            ),
            IndexProgressEvent::Indexing {
                project,
                n,
                total,
                indexed,
                path,
            } => format!(
                "index {}  indexing  {} / {} files  ({} indexed, {:.1}%)  {}\n",
                project,
                format_number(*n),
                format_number(*total),
                format_number(*indexed),
                crate::stats::percent(*n, *total),
                shorten_path(path, 40)
            ),
            IndexProgressEvent::Finished {
                project,
                indexed,
                total,
                interrupted,
            } => format!(
                "index {}  {}  {} / {} files indexed\n",
                project,
                if *interrupted { "interrupted" } else { "done" },
                format_number(*indexed),
                format_number(*total)
            ),
        }
    }
}

impl IndexProgressReporter for StderrProgress {
    fn report(&self, event: IndexProgressEvent) {
        let line = Self::line(&event);
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl JsonProgress {
    fn object(event: &IndexProgressEvent) -> serde_json::Value {
        match event {
            IndexProgressEvent::Discovering { project } => serde_json::json!({
                "event": "progress",
                "project": project,
                "phase": "discovering"
            }),
            IndexProgressEvent::Discovered {
                project,
                discovered,
                eligible,
            } => serde_json::json!({
                "event": "progress",
                "project": project,
                "phase": "discovered",
                "discovered": discovered,
                "eligible": eligible
            }),
            IndexProgressEvent::Indexing {
                project,
                n,
                total,
                indexed,
                path,
            } => serde_json::json!({
                "event": "progress",
                "project": project,
                "phase": "indexing",
                "n": n,
                "total": total,
                "indexed": indexed,
                "path": path
            }),
            IndexProgressEvent::Finished {
                project,
                indexed,
                total,
                interrupted,
            } => serde_json::json!({
                "event": "progress",
                "project": project,
                "phase": "finished",
                "indexed": indexed,
                "total": total,
                "interrupted": interrupted
            }),
        }
    }
}

impl IndexProgressReporter for JsonProgress {
    fn report(&self, event: IndexProgressEvent) {
        if let Ok(line) = serde_json::to_string(&Self::object(&event)) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IndexProgressReporter for NoProgress {
    fn report(&self, _event: IndexProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Keep the tail of long paths: `.../deeply/nested/file.rs`.
fn shorten_path(path: &str, max_chars: usize) -> String {
    let count = path.chars().count();
    if count <= max_chars {
        return path.to_string();
    }
    let tail: String = path.chars().skip(count - max_chars.saturating_sub(3)).collect();
    format!("...{}", tail)
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode. Shared by every pipeline worker.
    pub fn reporter(&self) -> Arc<dyn IndexProgressReporter> {
        match self {
            ProgressMode::Off => Arc::new(NoProgress),
            ProgressMode::Human => Arc::new(StderrProgress),
            ProgressMode::Json => Arc::new(JsonProgress),
        }
    }
}
