//! Vector store selection.
//!
//! The trait and the in-memory backend come from `synapstor-core`; the
//! Qdrant adapter lives in [`crate::qdrant`].

use std::sync::Arc;

use anyhow::{bail, Result};

pub use synapstor_core::store::memory::InMemoryStore;
pub use synapstor_core::store::VectorStore;

use crate::config::StoreConfig;
use crate::qdrant::QdrantStore;

/// Create the [`VectorStore`] named by `config.backend`.
///
/// | Config Value | Store |
/// |-------------|-------|
/// | `"qdrant"` | [`QdrantStore`] |
/// | `"memory"` | [`InMemoryStore`] (process-local, for dry runs and tests) |
///
/// No connection is made here; reachability is checked when the pipeline
/// resolves its collection.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn VectorStore>> {
    match config.backend.as_str() {
        "qdrant" => Ok(Arc::new(QdrantStore::from_config(config)?)),
        "memory" => Ok(Arc::new(InMemoryStore::new())),
        other => bail!("Unknown store backend: {}", other),
    }
}
