//! In-memory [`VectorStore`] implementation for tests and dry runs.
//!
//! Uses `HashMap`s behind `std::sync::RwLock` for thread safety. Search is
//! brute force over every point in the collection.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{Distance, SearchHit};

use super::VectorStore;

struct VectorParams {
    size: usize,
    distance: Distance,
}

struct StoredPoint {
    vectors: HashMap<String, Vec<f32>>,
    payload: serde_json::Value,
}

#[derive(Default)]
struct Collection {
    vectors: BTreeMap<String, VectorParams>,
    points: HashMap<String, StoredPoint>,
}

/// In-memory store. Contents live for the lifetime of the value.
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points stored in `collection` (0 when it does not exist).
    pub fn point_count(&self, collection: &str) -> usize {
        self.read()
            .map(|c| c.get(collection).map(|c| c.points.len()).unwrap_or(0))
            .unwrap_or(0)
    }

    /// Ids of every point in `collection`, sorted.
    pub fn point_ids(&self, collection: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .read()
            .map(|c| {
                c.get(collection)
                    .map(|c| c.points.keys().cloned().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Payload of one point, if it exists.
    pub fn payload(&self, collection: &str, id: &str) -> Option<serde_json::Value> {
        let collections = self.read().ok()?;
        collections
            .get(collection)?
            .points
            .get(id)
            .map(|p| p.payload.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

fn score(distance: Distance, a: &[f32], b: &[f32]) -> f32 {
    match distance {
        Distance::Cosine => cosine_similarity(a, b),
        Distance::Dot => a.iter().zip(b).map(|(x, y)| x * y).sum(),
        Distance::Euclid => -a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn backend(&self) -> &str {
        "memory"
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(name))
    }

    async fn create_collection(
        &self,
        name: &str,
        vector_field: &str,
        size: usize,
        distance: Distance,
    ) -> Result<()> {
        let mut collections = self.write()?;
        if collections.contains_key(name) {
            bail!("collection '{}' already exists", name);
        }
        let mut collection = Collection::default();
        collection
            .vectors
            .insert(vector_field.to_string(), VectorParams { size, distance });
        collections.insert(name.to_string(), collection);
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.write()?.remove(name);
        Ok(())
    }

    async fn collection_vector_fields(&self, name: &str) -> Result<BTreeSet<String>> {
        let collections = self.read()?;
        let collection = collections
            .get(name)
            .ok_or_else(|| anyhow!("collection '{}' not found", name))?;
        Ok(collection.vectors.keys().cloned().collect())
    }

    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        vector_field: &str,
        vector: &[f32],
        payload: &serde_json::Value,
    ) -> Result<()> {
        let mut collections = self.write()?;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| anyhow!("collection '{}' not found", collection))?;
        let params = target
            .vectors
            .get(vector_field)
            .ok_or_else(|| anyhow!("vector field '{}' not found", vector_field))?;
        if params.size != vector.len() {
            bail!(
                "vector dimension mismatch for '{}': expected {}, got {}",
                vector_field,
                params.size,
                vector.len()
            );
        }

        let mut vectors = HashMap::new();
        vectors.insert(vector_field.to_string(), vector.to_vec());
        target.points.insert(
            id.to_string(),
            StoredPoint {
                vectors,
                payload: payload.clone(),
            },
        );
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector_field: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let collections = self.read()?;
        let target = collections
            .get(collection)
            .ok_or_else(|| anyhow!("collection '{}' not found", collection))?;
        let distance = target
            .vectors
            .get(vector_field)
            .map(|p| p.distance)
            .ok_or_else(|| anyhow!("vector field '{}' not found", vector_field))?;

        let mut hits: Vec<SearchHit> = target
            .points
            .iter()
            .filter_map(|(id, point)| {
                point.vectors.get(vector_field).map(|v| SearchHit {
                    id: id.clone(),
                    payload: point.payload.clone(),
                    score: score(distance, query, v),
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn upsert_overwrites_by_id() {
        let store = InMemoryStore::new();
        store
            .create_collection("c", "v", 2, Distance::Cosine)
            .await
            .unwrap();

        store
            .upsert("c", "id-1", "v", &[1.0, 0.0], &json!({"document": "old"}))
            .await
            .unwrap();
        store
            .upsert("c", "id-1", "v", &[0.0, 1.0], &json!({"document": "new"}))
            .await
            .unwrap();

        assert_eq!(store.point_count("c"), 1);
        assert_eq!(store.payload("c", "id-1").unwrap()["document"], "new");
    }

    #[tokio::test]
    async fn upsert_rejects_unknown_field_and_wrong_size() {
        let store = InMemoryStore::new();
        store
            .create_collection("c", "v", 2, Distance::Cosine)
            .await
            .unwrap();
        assert!(store
            .upsert("c", "x", "other", &[1.0, 0.0], &json!({}))
            .await
            .is_err());
        assert!(store.upsert("c", "x", "v", &[1.0], &json!({})).await.is_err());
        assert!(store
            .upsert("missing", "x", "v", &[1.0, 0.0], &json!({}))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn collection_lifecycle() {
        let store = InMemoryStore::new();
        assert!(!store.collection_exists("c").await.unwrap());
        store
            .create_collection("c", "fast-x", 3, Distance::Cosine)
            .await
            .unwrap();
        assert!(store.collection_exists("c").await.unwrap());
        assert!(store
            .create_collection("c", "fast-x", 3, Distance::Cosine)
            .await
            .is_err());

        let fields = store.collection_vector_fields("c").await.unwrap();
        assert_eq!(fields.into_iter().collect::<Vec<_>>(), vec!["fast-x"]);

        store.delete_collection("c").await.unwrap();
        assert!(!store.collection_exists("c").await.unwrap());
        assert!(store.collection_vector_fields("c").await.is_err());
    }

    #[tokio::test]
    async fn search_ranks_by_similarity() {
        let store = InMemoryStore::new();
        store
            .create_collection("c", "v", 2, Distance::Cosine)
            .await
            .unwrap();
        store
            .upsert("c", "near", "v", &[1.0, 0.1], &json!({"document": "near"}))
            .await
            .unwrap();
        store
            .upsert("c", "far", "v", &[-1.0, 0.0], &json!({"document": "far"}))
            .await
            .unwrap();

        let hits = store.search("c", "v", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "near");
        assert!(hits[0].score > hits[1].score);

        let top = store.search("c", "v", &[1.0, 0.0], 1).await.unwrap();
        assert_eq!(top.len(), 1);
    }
}
