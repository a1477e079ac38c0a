//! Qdrant REST adapter for [`VectorStore`].
//!
//! Speaks the plain HTTP API (`/collections/...`), so no gRPC toolchain is
//! needed. Record ids are 32-hex MD5 digests, which Qdrant accepts as UUIDs.
//! Every collection is created with one *named* vector field.

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde_json::{json, Value};
use synapstor_core::models::{Distance, SearchHit};
use synapstor_core::store::VectorStore;

use crate::config::StoreConfig;

pub struct QdrantStore {
    client: reqwest::Client,
    base: Url,
    base_url: String,
    api_key: Option<String>,
}

impl QdrantStore {
    pub fn new(url: &str, api_key: Option<&str>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        let base_url = url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_url).with_context(|| format!("invalid Qdrant URL: {}", url))?;
        if base.cannot_be_a_base() {
            bail!("invalid Qdrant URL: {}", url);
        }
        Ok(Self {
            client,
            base,
            base_url,
            api_key: api_key.filter(|k| !k.is_empty()).map(str::to_string),
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Self::new(&config.url, config.api_key.as_deref(), config.timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base URL extended with `segments`, each percent-encoded as one path
    /// segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Value> {
        let response = builder
            .send()
            .await
            .with_context(|| format!("qdrant {} request failed (is Qdrant running at {}?)", what, self.base_url))?;
        json_or_error(response, what).await
    }
}

async fn json_or_error(response: Response, what: &str) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("qdrant {} failed ({}): {}", what, status, body);
    }
    Ok(response.json().await?)
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn backend(&self) -> &str {
        "qdrant"
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let body = self
            .send(self.request(Method::GET, self.endpoint(&["collections"])), "list collections")
            .await?;
        Ok(parse_collection_names(&body)?.iter().any(|n| n == name))
    }

    async fn create_collection(
        &self,
        name: &str,
        vector_field: &str,
        size: usize,
        distance: Distance,
    ) -> Result<()> {
        let body = json!({
            "vectors": {
                vector_field: {
                    "size": size,
                    "distance": distance.as_str(),
                }
            }
        });
        self.send(
            self.request(Method::PUT, self.endpoint(&["collections", name]))
                .json(&body),
            "create collection",
        )
        .await?;
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.send(
            self.request(Method::DELETE, self.endpoint(&["collections", name])),
            "delete collection",
        )
        .await?;
        Ok(())
    }

    async fn collection_vector_fields(&self, name: &str) -> Result<BTreeSet<String>> {
        let body = self
            .send(
                self.request(Method::GET, self.endpoint(&["collections", name])),
                "collection info",
            )
            .await?;
        parse_vector_fields(&body)
    }

    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        vector_field: &str,
        vector: &[f32],
        payload: &Value,
    ) -> Result<()> {
        let body = json!({
            "points": [{
                "id": id,
                "vector": { vector_field: vector },
                "payload": payload,
            }]
        });
        let mut url = self.endpoint(&["collections", collection, "points"]);
        url.set_query(Some("wait=true"));
        self.send(self.request(Method::PUT, url).json(&body), "upsert")
        .await?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector_field: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let body = json!({
            "vector": { "name": vector_field, "vector": query },
            "limit": limit,
            "with_payload": true,
        });
        let response = self
            .send(
                self.request(
                    Method::POST,
                    self.endpoint(&["collections", collection, "points", "search"]),
                )
                .json(&body),
                "search",
            )
            .await?;
        parse_search_hits(&response)
    }
}

/// `GET /collections` → collection names.
fn parse_collection_names(body: &Value) -> Result<Vec<String>> {
    let collections = body
        .pointer("/result/collections")
        .and_then(|c| c.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Qdrant response: missing result.collections"))?;
    Ok(collections
        .iter()
        .filter_map(|c| c.get("name").and_then(|n| n.as_str()))
        .map(str::to_string)
        .collect())
}

/// `GET /collections/{name}` → named vector fields.
///
/// `params.vectors` is either a map of named vector configs or a single
/// unnamed config (`{"size": .., "distance": ..}`); the latter has no names.
fn parse_vector_fields(body: &Value) -> Result<BTreeSet<String>> {
    let vectors = body
        .pointer("/result/config/params/vectors")
        .and_then(|v| v.as_object())
        .ok_or_else(|| anyhow::anyhow!("Invalid Qdrant response: missing vector config"))?;

    if vectors.contains_key("size") {
        return Ok(BTreeSet::new());
    }

    Ok(vectors
        .iter()
        .filter(|(_, config)| config.is_object())
        .map(|(name, _)| name.clone())
        .collect())
}

/// `POST /collections/{name}/points/search` → ranked hits.
fn parse_search_hits(body: &Value) -> Result<Vec<SearchHit>> {
    let result = body
        .get("result")
        .and_then(|r| r.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Qdrant response: missing result array"))?;

    let mut hits = Vec::with_capacity(result.len());
    for entry in result {
        let id = match entry.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => bail!("Invalid Qdrant response: point without id"),
        };
        let score = entry.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0) as f32;
        let payload = entry.get("payload").cloned().unwrap_or(Value::Null);
        hits.push(SearchHit { id, payload, score });
    }
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_collection_names() {
        let body = json!({
            "result": {"collections": [{"name": "synapstor"}, {"name": "other"}]},
            "status": "ok"
        });
        assert_eq!(
            parse_collection_names(&body).unwrap(),
            vec!["synapstor".to_string(), "other".to_string()]
        );
        assert!(parse_collection_names(&json!({"status": "ok"})).is_err());
    }

    #[test]
    fn test_parse_named_vector_fields() {
        let body = json!({
            "result": {"config": {"params": {"vectors": {
                "fast-all-minilm-l6-v2": {"size": 384, "distance": "Cosine"},
                "openai-text-embedding-3-small": {"size": 1536, "distance": "Cosine"}
            }}}}
        });
        let fields = parse_vector_fields(&body).unwrap();
        assert_eq!(
            fields.into_iter().collect::<Vec<_>>(),
            vec!["fast-all-minilm-l6-v2", "openai-text-embedding-3-small"]
        );
    }

    #[test]
    fn test_parse_unnamed_vector_config() {
        let body = json!({
            "result": {"config": {"params": {"vectors": {"size": 384, "distance": "Cosine"}}}}
        });
        assert!(parse_vector_fields(&body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_search_hits() {
        let body = json!({
            "result": [
                {"id": "5d41402abc4b2a76b9719d911017c592", "score": 0.91,
                 "payload": {"document": "hello", "metadata": {"relative_path": "a.txt"}}},
                {"id": 7, "score": 0.5}
            ]
        });
        let hits = parse_search_hits(&body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document(), "hello");
        assert_eq!(hits[0].metadata_str("relative_path"), Some("a.txt"));
        assert!((hits[0].score - 0.91).abs() < 1e-6);
        assert_eq!(hits[1].id, "7");
        assert_eq!(hits[1].document(), "");
    }

    #[test]
    fn test_new_trims_url_and_drops_empty_key() {
        let store = QdrantStore::new("http://localhost:6333/", Some(""), 5).unwrap();
        assert_eq!(store.base_url(), "http://localhost:6333");
        assert!(store.api_key.is_none());
    }

    #[test]
    fn test_endpoint_encodes_collection_name() {
        let store = QdrantStore::new("http://localhost:6333", None, 5).unwrap();
        assert_eq!(
            store.endpoint(&["collections", "synapstor"]).as_str(),
            "http://localhost:6333/collections/synapstor"
        );
        assert_eq!(
            store
                .endpoint(&["collections", "my docs/v1?x", "points"])
                .as_str(),
            "http://localhost:6333/collections/my%20docs%2Fv1%3Fx/points"
        );

        let prefixed = QdrantStore::new("https://example.com/qdrant/", None, 5).unwrap();
        assert_eq!(
            prefixed.endpoint(&["collections"]).as_str(),
            "https://example.com/qdrant/collections"
        );
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(QdrantStore::new("localhost 6333", None, 5).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_errors() {
        // Port 9 (discard) is closed on test machines.
        let store = QdrantStore::new("http://127.0.0.1:9", None, 2).unwrap();
        let err = store.collection_exists("synapstor").await.unwrap_err();
        assert!(format!("{err:#}").contains("is Qdrant running"));
    }
}
