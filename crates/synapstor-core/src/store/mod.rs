//! Vector store abstraction.
//!
//! The [`VectorStore`] trait covers everything the indexing pipeline needs
//! from a store: collection provisioning, introspection of named vector
//! fields, idempotent upsert by id, and a single similarity query. The
//! Qdrant REST adapter lives in the app crate; [`memory::InMemoryStore`]
//! lives here.
//!
//! Implementations must be `Send + Sync`; one handle is shared by every
//! pipeline worker.

pub mod memory;

use std::collections::BTreeSet;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Distance, SearchHit};

/// Abstract vector store backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`collection_exists`](VectorStore::collection_exists) | Check for a named collection |
/// | [`create_collection`](VectorStore::create_collection) | Create a collection with one named vector field |
/// | [`delete_collection`](VectorStore::delete_collection) | Drop a collection and all its points |
/// | [`collection_vector_fields`](VectorStore::collection_vector_fields) | List named vector fields |
/// | [`upsert`](VectorStore::upsert) | Insert or overwrite a point by id |
/// | [`search`](VectorStore::search) | Ranked similarity query |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend label for logs (e.g. `"qdrant"`).
    fn backend(&self) -> &str;

    async fn collection_exists(&self, name: &str) -> Result<bool>;

    async fn create_collection(
        &self,
        name: &str,
        vector_field: &str,
        size: usize,
        distance: Distance,
    ) -> Result<()>;

    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Names of the collection's named vector fields.
    ///
    /// A collection configured with a single unnamed vector reports an
    /// empty set.
    async fn collection_vector_fields(&self, name: &str) -> Result<BTreeSet<String>>;

    /// Insert a point, or overwrite the existing point with the same id.
    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        vector_field: &str,
        vector: &[f32],
        payload: &serde_json::Value,
    ) -> Result<()>;

    /// Return up to `limit` points ranked by similarity to `query`.
    async fn search(
        &self,
        collection: &str,
        vector_field: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>>;
}
