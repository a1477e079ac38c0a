//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait that all embedding backends
//! implement. Concrete providers (fastembed, OpenAI, Ollama) live in the
//! `synapstor-index` app crate and are chosen by configuration at startup.

use anyhow::{anyhow, Result};
use async_trait::async_trait;

/// Trait for embedding providers.
///
/// Implementations must be safe for concurrent use: the pipeline shares one
/// provider across all workers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"sentence-transformers/all-MiniLM-L6-v2"`).
    fn model_name(&self) -> &str;

    /// Returns the canonical vector field name used when this provider
    /// creates a collection (e.g. `"fast-all-minilm-l6-v2"`).
    fn vector_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn vector_size(&self) -> usize;

    /// Embed a batch of documents. Output order matches input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_documents(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Empty embedding response"))
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, vectors of
/// different lengths, and zero-magnitude vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
