//! # Synapstor Index CLI (`synapstor-index`)
//!
//! Indexes one project directory into a vector store, then optionally runs a
//! semantic query against the freshly indexed collection.
//!
//! ## Examples
//!
//! ```bash
//! # Index ./my-app into the default Qdrant at localhost:6333
//! synapstor-index --project my-app --path ./my-app
//!
//! # Remote Qdrant, more workers, start from a clean collection
//! QDRANT_URL=https://qdrant.example.com QDRANT_API_KEY=... \
//!     synapstor-index -p my-app -d ./my-app -w 8 --recreate-collection
//!
//! # Index, then ask a question
//! synapstor-index -p my-app -d ./my-app --query "how are sessions stored?" --limit 5
//! ```
//!
//! ## Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | `0` | Run completed (individual files may still have failed) |
//! | `1` | Setup failure (bad path, store or provider unavailable) or interrupted |

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use synapstor_index::collection::CollectionRequest;
use synapstor_index::config::{load_config, Config};
use synapstor_index::embedding::{create_provider, EmbeddingProvider};
use synapstor_index::error::IndexError;
use synapstor_index::pipeline::{validate_project_root, CancelFlag, IndexingPipeline, PipelineOptions};
use synapstor_index::progress::ProgressMode;
use synapstor_index::search;
use synapstor_index::store::{create_store, VectorStore};

/// Index a project's text files into a vector store.
///
/// Each file is stored under a deterministic id derived from the project
/// name and the file's absolute path, so re-running updates records in
/// place instead of duplicating them.
#[derive(Parser)]
#[command(
    name = "synapstor-index",
    about = "Index a project's text files into a vector store",
    version
)]
struct Cli {
    /// Project name stored with every record and used in record ids.
    #[arg(long, short = 'p')]
    project: String,

    /// Project root directory to index.
    #[arg(long, short = 'd')]
    path: PathBuf,

    /// Target collection name [default: synapstor].
    #[arg(long, short = 'c')]
    collection: Option<String>,

    /// Qdrant URL [default: http://localhost:6333].
    #[arg(long, env = "QDRANT_URL")]
    qdrant_url: Option<String>,

    /// Qdrant API key.
    #[arg(long, env = "QDRANT_API_KEY", hide_env_values = true)]
    qdrant_api_key: Option<String>,

    /// Store backend: `qdrant` or `memory`.
    #[arg(long)]
    store: Option<String>,

    /// Embedding provider: `local`, `openai`, or `ollama`.
    #[arg(long)]
    embedding_provider: Option<String>,

    /// Embedding model identifier.
    #[arg(long)]
    embedding_model: Option<String>,

    /// Vector field name used when creating the collection, and preferred
    /// when an existing collection has several.
    #[arg(long)]
    vector_name: Option<String>,

    /// Number of parallel workers [default: 4].
    #[arg(long, short = 'w')]
    workers: Option<usize>,

    /// Largest file to index, in megabytes [default: 5].
    #[arg(long)]
    max_file_size: Option<u64>,

    /// Delete and recreate the collection before indexing.
    #[arg(long)]
    recreate_collection: bool,

    /// Semantic query to run after indexing.
    #[arg(long, short = 'q')]
    query: Option<String>,

    /// Maximum number of query results.
    #[arg(long, default_value_t = 10)]
    limit: usize,

    /// Log progress details (including each record id) to stderr.
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Progress output on stderr.
    #[arg(long, value_enum, default_value = "auto")]
    progress: ProgressArg,

    /// Path to configuration file (TOML). CLI flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProgressArg {
    /// Human progress when stderr is a terminal, otherwise none.
    Auto,
    Human,
    Json,
    Off,
}

impl ProgressArg {
    fn mode(self) -> ProgressMode {
        match self {
            ProgressArg::Auto => ProgressMode::default_for_tty(),
            ProgressArg::Human => ProgressMode::Human,
            ProgressArg::Json => ProgressMode::Json,
            ProgressArg::Off => ProgressMode::Off,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Merge the optional config file with CLI overrides and validate the result.
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    if let Some(url) = &cli.qdrant_url {
        config.store.url = url.clone();
    }
    if let Some(key) = &cli.qdrant_api_key {
        config.store.api_key = Some(key.clone());
    }
    if let Some(backend) = &cli.store {
        config.store.backend = backend.clone();
    }
    if let Some(provider) = &cli.embedding_provider {
        config.embedding.provider = provider.clone();
    }
    if let Some(model) = &cli.embedding_model {
        config.embedding.model = Some(model.clone());
    }
    if let Some(name) = &cli.vector_name {
        config.embedding.vector_name = Some(name.clone());
    }
    if let Some(collection) = &cli.collection {
        config.indexing.collection = collection.clone();
    }
    if let Some(workers) = cli.workers {
        config.indexing.workers = workers;
    }
    if let Some(mb) = cli.max_file_size {
        config.indexing.max_file_size_bytes = mb.saturating_mul(1024 * 1024);
    }

    config.validate()?;
    Ok(config)
}

/// Collaborators built before any file is touched.
struct Setup {
    config: Config,
    root: PathBuf,
    store: Arc<dyn VectorStore>,
    provider: Arc<dyn EmbeddingProvider>,
}

async fn setup(cli: &Cli) -> anyhow::Result<Setup> {
    let config = build_config(cli).map_err(IndexError::setup)?;

    let root = validate_project_root(&cli.path)?;
    let store = create_store(&config.store).map_err(IndexError::setup)?;

    tracing::info!(
        provider = %config.embedding.provider,
        model = config.embedding.model.as_deref().unwrap_or("default"),
        "loading embedding provider"
    );
    let embedding_config = config.embedding.clone();
    let provider = tokio::task::spawn_blocking(move || create_provider(&embedding_config))
        .await
        .map_err(IndexError::setup)?
        .map_err(|e| IndexError::setup(e.context("embedding provider unavailable")))?;

    Ok(Setup {
        config,
        root,
        store,
        provider,
    })
}

/// Turn Ctrl-C into a cancel request for the rest of the process lifetime.
fn listen_for_interrupt(cancel: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing in-flight files");
            cancel.cancel();
        }
    });
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let cancel = CancelFlag::new();
    listen_for_interrupt(cancel.clone());

    // Model download and load can take minutes; an interrupt abandons it.
    let Setup {
        config,
        root,
        store,
        provider,
    } = tokio::select! {
        ready = setup(&cli) => ready?,
        _ = cancel.cancelled() => return Err(IndexError::SetupInterrupted.into()),
    };

    let mut options = PipelineOptions::new(cli.project.clone(), root, config.indexing.clone());
    options.collection = CollectionRequest {
        name: config.indexing.collection.clone(),
        vector_name: config.embedding.vector_name.clone(),
        recreate: cli.recreate_collection,
    };

    let pipeline = IndexingPipeline::new(options, Arc::clone(&provider), Arc::clone(&store))
        .with_reporter(cli.progress.mode().reporter())
        .with_cancel_flag(cancel);

    let run = pipeline.run().await?;
    print!("{}", run.stats.render_summary(&cli.project));

    if run.stats.interrupted {
        return Err(IndexError::Interrupted {
            processed: run.stats.processed(),
            eligible: run.stats.eligible,
        }
        .into());
    }

    if let Some(query) = &cli.query {
        match search::run_query(
            store.as_ref(),
            provider.as_ref(),
            &run.collection,
            query,
            cli.limit,
        )
        .await
        {
            Ok(hits) => print!("{}", search::render_hits(query, &hits)),
            Err(e) => tracing::error!(error = %format!("{:#}", e), "query failed"),
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            return ExitCode::from(1);
        }
    };

    let result = runtime.block_on(run(cli));
    // An abandoned model load may still hold a blocking thread.
    runtime.shutdown_background();

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
