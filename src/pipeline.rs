//! Indexing pipeline orchestration.
//!
//! Coordinates one run: collection setup → discovery → filtering →
//! per-file processing (sniff, read, metadata, id, embed, upsert) →
//! statistics. Setup failures abort the run; per-file failures are counted
//! and logged and the run continues.
//!
//! Small projects are processed sequentially. At or above
//! `parallel_threshold` eligible files, `workers` tasks pull files from a
//! shared queue. Both paths fold outcomes through the same
//! [`StatsCollector`], so totals do not depend on the mode.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use synapstor_core::embedding::EmbeddingProvider;
use synapstor_core::identity::resolve_id;
use synapstor_core::models::{CollectionDescriptor, DocumentRecord};
use synapstor_core::store::VectorStore;
use tokio::sync::Notify;
use tokio::task::JoinSet;

use crate::collection::{resolve_collection, CollectionRequest};
use crate::config::IndexingConfig;
use crate::discovery::{discover_files, FileCandidate, FileFilter};
use crate::encoding::{read_text, TextEncoding};
use crate::error::{IndexError, Result};
use crate::metadata::extract_metadata;
use crate::progress::{IndexProgressEvent, IndexProgressReporter, NoProgress};
use crate::sniff::{sniff_file, BinaryThresholds};
use crate::stats::{FileOutcome, IndexingStats, SkipReason, StatsCollector};

/// Shared interrupt flag. Setting it stops dispatch of new files; files
/// already being processed finish. Setup steps still in flight are
/// abandoned.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<CancelState>);

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let notified = self.0.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent cancel is not missed.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

/// Everything a run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub project: String,
    pub root: PathBuf,
    pub collection: CollectionRequest,
    pub indexing: IndexingConfig,
}

impl PipelineOptions {
    /// Options for `project` at `root`, writing to `indexing.collection`.
    pub fn new(project: impl Into<String>, root: impl Into<PathBuf>, indexing: IndexingConfig) -> Self {
        Self {
            project: project.into(),
            root: root.into(),
            collection: CollectionRequest {
                name: indexing.collection.clone(),
                ..CollectionRequest::default()
            },
            indexing,
        }
    }
}

/// Result of a completed (or interrupted) run.
#[derive(Debug, Clone)]
pub struct IndexRun {
    pub stats: IndexingStats,
    pub collection: CollectionDescriptor,
}

/// Check that `root` is an existing directory and return its canonical form.
pub fn validate_project_root(root: &Path) -> Result<PathBuf> {
    if !root.exists() {
        return Err(IndexError::setup(anyhow::anyhow!(
            "project path does not exist: {}",
            root.display()
        )));
    }
    if !root.is_dir() {
        return Err(IndexError::setup(anyhow::anyhow!(
            "project path is not a directory: {}",
            root.display()
        )));
    }
    root.canonicalize().map_err(|e| {
        IndexError::setup(anyhow::Error::new(e).context(format!(
            "cannot resolve project path {}",
            root.display()
        )))
    })
}

pub struct IndexingPipeline {
    options: PipelineOptions,
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    reporter: Arc<dyn IndexProgressReporter>,
    cancel: CancelFlag,
}

impl IndexingPipeline {
    pub fn new(
        options: PipelineOptions,
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            options,
            provider,
            store,
            reporter: Arc::new(NoProgress),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn IndexProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle for interrupting this pipeline from another task.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Index the project once.
    ///
    /// Returns `Err` for setup failures, and for an interrupt that arrives
    /// while the collection is still being resolved. An interrupt during
    /// processing returns `Ok` with `stats.interrupted` set.
    pub async fn run(&self) -> Result<IndexRun> {
        let started = Instant::now();
        let project = self.options.project.clone();

        let root = validate_project_root(&self.options.root)?;

        let descriptor = tokio::select! {
            biased;
            descriptor = resolve_collection(
                self.store.as_ref(),
                self.provider.as_ref(),
                &self.options.collection,
            ) => descriptor?,
            _ = self.cancel.cancelled() => return Err(IndexError::SetupInterrupted),
        };

        self.reporter.report(IndexProgressEvent::Discovering {
            project: project.clone(),
        });

        let discovered = discover_files(&root).map_err(IndexError::setup)?;
        let discovered_count = discovered.len() as u64;

        let filter = FileFilter::for_project(&root, &self.options.indexing);
        let eligible = filter.eligible(discovered);
        let eligible_count = eligible.len() as u64;

        tracing::info!(
            project = %project,
            root = %root.display(),
            discovered = discovered_count,
            eligible = eligible_count,
            "discovery finished"
        );
        self.reporter.report(IndexProgressEvent::Discovered {
            project: project.clone(),
            discovered: discovered_count,
            eligible: eligible_count,
        });

        let shared = Arc::new(Shared {
            project: project.clone(),
            root,
            collection: descriptor.clone(),
            encodings: self.options.indexing.encodings.clone(),
            max_content_chars: self.options.indexing.max_content_chars,
            thresholds: self.options.indexing.binary,
            provider: Arc::clone(&self.provider),
            store: Arc::clone(&self.store),
            reporter: Arc::clone(&self.reporter),
            collector: StatsCollector::new(discovered_count, eligible_count),
            cancel: self.cancel.clone(),
            total: eligible_count,
        });

        let workers = self.options.indexing.workers.max(1);
        if eligible.len() < self.options.indexing.parallel_threshold || workers == 1 {
            tracing::debug!(files = eligible.len(), "processing sequentially");
            run_sequential(&shared, eligible).await;
        } else {
            tracing::debug!(files = eligible.len(), workers, "processing with worker pool");
            run_parallel(&shared, eligible, workers).await;
        }

        let mut stats = shared.collector.snapshot();
        stats.elapsed_ms = started.elapsed().as_millis() as u64;
        stats.interrupted = self.cancel.is_cancelled() && stats.processed() < stats.eligible;

        if stats.interrupted {
            tracing::warn!(
                processed = stats.processed(),
                eligible = stats.eligible,
                "indexing interrupted"
            );
        }

        self.reporter.report(IndexProgressEvent::Finished {
            project,
            indexed: stats.indexed,
            total: stats.eligible,
            interrupted: stats.interrupted,
        });

        Ok(IndexRun {
            stats,
            collection: descriptor,
        })
    }
}

async fn run_sequential(shared: &Shared, files: Vec<FileCandidate>) {
    for file in files {
        if shared.cancel.is_cancelled() {
            break;
        }
        shared.handle(&file).await;
    }
}

async fn run_parallel(shared: &Arc<Shared>, files: Vec<FileCandidate>, workers: usize) {
    let worker_count = workers.min(files.len());
    let queue = Arc::new(Mutex::new(VecDeque::from(files)));

    let mut set = JoinSet::new();
    for _ in 0..worker_count {
        let shared = Arc::clone(shared);
        let queue = Arc::clone(&queue);
        set.spawn(async move {
            loop {
                if shared.cancel.is_cancelled() {
                    break;
                }
                let next = queue.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
                let Some(file) = next else {
                    break;
                };
                shared.handle(&file).await;
            }
        });
    }

    while let Some(joined) = set.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "indexing worker stopped unexpectedly");
        }
    }
}

/// State shared by every unit of work in one run.
struct Shared {
    project: String,
    root: PathBuf,
    collection: CollectionDescriptor,
    encodings: Vec<TextEncoding>,
    max_content_chars: usize,
    thresholds: BinaryThresholds,
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    reporter: Arc<dyn IndexProgressReporter>,
    collector: StatsCollector,
    cancel: CancelFlag,
    total: u64,
}

impl Shared {
    /// Process one file, record its outcome, and report progress.
    async fn handle(&self, file: &FileCandidate) {
        let outcome = match self.process(file).await {
            Ok(outcome) => outcome,
            Err(e) => FileOutcome::Failed(e),
        };

        match &outcome {
            FileOutcome::Indexed { id, bytes } => {
                tracing::info!(path = %file.relative_path, id = %id, bytes, "indexed");
            }
            FileOutcome::Skipped(reason) => {
                tracing::debug!(path = %file.relative_path, reason = reason.as_str(), "skipped");
            }
            FileOutcome::Failed(e) => {
                let stage = e.stage().map(|s| s.as_str()).unwrap_or("unknown");
                tracing::warn!(path = %file.relative_path, stage, error = %e, "failed to index file");
            }
        }

        let stats = self.collector.record(&outcome);
        self.reporter.report(IndexProgressEvent::Indexing {
            project: self.project.clone(),
            n: stats.processed(),
            total: self.total,
            indexed: stats.indexed,
            path: file.relative_path.clone(),
        });
    }

    async fn process(&self, file: &FileCandidate) -> Result<FileOutcome> {
        let path = &file.absolute_path;
        let rel = &file.relative_path;

        let sample_path = path.clone();
        let thresholds = self.thresholds;
        let encodings = self.encodings.clone();
        let max_chars = self.max_content_chars;
        let loaded = tokio::task::spawn_blocking(move || {
            if sniff_file(&sample_path, &thresholds) {
                return None;
            }
            Some(read_text(&sample_path, &encodings, max_chars))
        })
        .await
        .map_err(|e| IndexError::Read {
            path: rel.clone(),
            reason: e.to_string(),
        })?;

        let Some(read) = loaded else {
            return Ok(FileOutcome::Skipped(SkipReason::Binary));
        };
        let text = read.map_err(|e| IndexError::Read {
            path: rel.clone(),
            reason: e.to_string(),
        })?;
        if text.truncated {
            tracing::debug!(path = %rel, max_chars = self.max_content_chars, "content truncated");
        }
        if text.content.trim().is_empty() {
            return Ok(FileOutcome::Skipped(SkipReason::Empty));
        }

        let (id, metadata) = extract_metadata(&self.project, &self.root, path)
            .and_then(|metadata| resolve_id(&metadata).map(|id| (id, metadata)))
            .map_err(|source| IndexError::Identity {
                path: rel.clone(),
                source,
            })?;
        let record = DocumentRecord {
            id,
            metadata,
            content: text.content,
        };

        let vector = self
            .provider
            .embed_documents(std::slice::from_ref(&record.content))
            .await
            .and_then(|vectors| {
                vectors
                    .into_iter()
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
            })
            .map_err(|e| IndexError::Embed {
                path: rel.clone(),
                reason: format!("{:#}", e),
            })?;

        self.store
            .upsert(
                &self.collection.name,
                &record.id,
                &self.collection.vector_field,
                &vector,
                &record.payload(),
            )
            .await
            .map_err(|e| IndexError::Upsert {
                path: rel.clone(),
                reason: format!("{:#}", e),
            })?;

        Ok(FileOutcome::Indexed {
            id: record.id,
            bytes: record.metadata.size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiters() {
        let flag = CancelFlag::new();
        let waiter = {
            let flag = flag.clone();
            tokio::spawn(async move { flag.cancelled().await })
        };
        tokio::task::yield_now().await;
        flag.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap();

        // Already cancelled: returns immediately.
        flag.cancelled().await;
    }

    #[test]
    fn test_validate_project_root() {
        let tmp = TempDir::new().unwrap();
        let canonical = validate_project_root(tmp.path()).unwrap();
        assert!(canonical.is_absolute());

        let missing = validate_project_root(&tmp.path().join("missing")).unwrap_err();
        assert!(missing.to_string().contains("does not exist"));

        let file = tmp.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        let not_dir = validate_project_root(&file).unwrap_err();
        assert!(not_dir.to_string().contains("not a directory"));
    }

    #[test]
    fn test_options_take_collection_from_indexing_config() {
        let indexing = IndexingConfig {
            collection: "notes".to_string(),
            ..IndexingConfig::default()
        };
        let options = PipelineOptions::new("demo", "/tmp/demo", indexing);
        assert_eq!(options.collection.name, "notes");
        assert!(!options.collection.recreate);
    }
}
