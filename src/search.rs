//! Post-index semantic query.
//!
//! Embeds a query string with the run's provider and asks the store for the
//! closest records in the run's collection and vector field.

use anyhow::Result;
use synapstor_core::embedding::EmbeddingProvider;
use synapstor_core::models::{CollectionDescriptor, SearchHit};
use synapstor_core::store::VectorStore;

/// Characters of document text shown per hit.
pub const SNIPPET_CHARS: usize = 150;

pub async fn run_query(
    store: &dyn VectorStore,
    provider: &dyn EmbeddingProvider,
    collection: &CollectionDescriptor,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchHit>> {
    let vector = provider.embed_query(query).await?;
    store
        .search(&collection.name, &collection.vector_field, &vector, limit)
        .await
}

/// Printable result list: rank, score, relative path and a snippet per hit.
pub fn render_hits(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No results for \"{}\"\n", query);
    }

    let mut out = format!("Results for \"{}\":\n", query);
    for (i, hit) in hits.iter().enumerate() {
        let path = hit
            .metadata_str("relative_path")
            .or_else(|| hit.metadata_str("absolute_path"))
            .unwrap_or("<unknown>");
        out.push_str(&format!("{}. [{:.4}] {}\n", i + 1, hit.score, path));
        out.push_str(&format!("    {}\n", snippet(hit.document(), SNIPPET_CHARS)));
    }
    out
}

/// First `max_chars` characters on one line, with `...` when cut.
pub fn snippet(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use synapstor_core::models::Distance;
    use synapstor_core::store::memory::InMemoryStore;

    struct AxisProvider;

    #[async_trait]
    impl EmbeddingProvider for AxisProvider {
        fn model_name(&self) -> &str {
            "axis"
        }
        fn vector_name(&self) -> &str {
            "axis"
        }
        fn vector_size(&self) -> usize {
            2
        }
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| if t.contains("rust") { vec![1.0, 0.0] } else { vec![0.0, 1.0] })
                .collect())
        }
    }

    fn hit(path: &str, document: &str, score: f32) -> SearchHit {
        SearchHit {
            id: "id".to_string(),
            payload: serde_json::json!({
                "document": document,
                "metadata": {"relative_path": path}
            }),
            score,
        }
    }

    #[test]
    fn test_snippet() {
        assert_eq!(snippet("short\n  text", 150), "short text");
        let long = "x".repeat(200);
        let s = snippet(&long, 150);
        assert_eq!(s.len(), 153);
        assert!(s.ends_with("..."));
    }

    #[test]
    fn test_render_hits() {
        let out = render_hits("ownership", &[hit("src/lib.rs", "borrow checker", 0.87654)]);
        assert!(out.contains("Results for \"ownership\""));
        assert!(out.contains("1. [0.8765] src/lib.rs"));
        assert!(out.contains("    borrow checker"));
        assert_eq!(render_hits("x", &[]), "No results for \"x\"\n");
    }

    #[tokio::test]
    async fn test_run_query_ranks_by_similarity() {
        let store = InMemoryStore::new();
        store
            .create_collection("docs", "axis", 2, Distance::Cosine)
            .await
            .unwrap();
        store
            .upsert("docs", "a", "axis", &[1.0, 0.0], &serde_json::json!({"document": "rust"}))
            .await
            .unwrap();
        store
            .upsert("docs", "b", "axis", &[0.0, 1.0], &serde_json::json!({"document": "python"}))
            .await
            .unwrap();
        let collection = CollectionDescriptor {
            name: "docs".to_string(),
            vector_field: "axis".to_string(),
            vector_size: 2,
            distance: Distance::Cosine,
        };

        let hits = run_query(&store, &AxisProvider, &collection, "rust please", 1)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
    }
}
