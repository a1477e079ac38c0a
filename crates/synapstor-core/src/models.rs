//! Core data models shared by the pipeline, the stores, and the providers.
//!
//! A file flows through the pipeline as a `FileCandidate` (app crate), then
//! becomes a [`DocumentRecord`] once its content is read and its identity is
//! resolved. The record's [`DocumentRecord::payload`] is what lands in the
//! vector store next to the embedding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Metadata key holding the project name. Part of the identity pair.
pub const PROJECT_KEY: &str = "project";
/// Metadata key holding the absolute file path. Part of the identity pair.
pub const ABSOLUTE_PATH_KEY: &str = "absolute_path";
/// Metadata key holding the bare file name.
pub const FILENAME_KEY: &str = "filename";

/// Factual, descriptive metadata for one indexed file.
///
/// `project` and `absolute_path` form the identity pair; every other field is
/// descriptive and only participates in identity derivation when that pair is
/// incomplete (see [`crate::identity::resolve_id`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub project: String,
    pub absolute_path: String,
    pub relative_path: String,
    pub filename: String,
    pub extension: String,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
    /// High-resolution uniqueness salt, present only when identity metadata
    /// is degraded (stat failure or an empty identity key).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl FileMetadata {
    /// Flatten into `key -> value` pairs, ordered by key.
    ///
    /// Absent optional fields are omitted entirely.
    pub fn fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        fields.insert(PROJECT_KEY.to_string(), self.project.clone());
        fields.insert(ABSOLUTE_PATH_KEY.to_string(), self.absolute_path.clone());
        fields.insert("relative_path".to_string(), self.relative_path.clone());
        fields.insert(FILENAME_KEY.to_string(), self.filename.clone());
        fields.insert("extension".to_string(), self.extension.clone());
        fields.insert("size_bytes".to_string(), self.size_bytes.to_string());
        if let Some(modified_at) = &self.modified_at {
            fields.insert("modified_at".to_string(), modified_at.clone());
        }
        if let Some(timestamp) = &self.timestamp {
            fields.insert("timestamp".to_string(), timestamp.clone());
        }
        fields
    }

    /// True when both identity keys are non-empty.
    pub fn has_identity(&self) -> bool {
        !self.project.is_empty() && !self.absolute_path.is_empty()
    }
}

/// A file ready to be embedded and upserted.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub id: String,
    pub metadata: FileMetadata,
    pub content: String,
}

impl DocumentRecord {
    /// Store payload: `{"document": <content>, "metadata": {...}}`.
    pub fn payload(&self) -> serde_json::Value {
        serde_json::json!({
            "document": self.content,
            "metadata": self.metadata,
        })
    }
}

/// Similarity metric of a vector field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    Cosine,
    Dot,
    Euclid,
}

impl Distance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Distance::Cosine => "Cosine",
            Distance::Dot => "Dot",
            Distance::Euclid => "Euclid",
        }
    }
}

/// Where and how records are written for the current run.
///
/// Resolved once at pipeline start and reused for every upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionDescriptor {
    pub name: String,
    pub vector_field: String,
    pub vector_size: usize,
    pub distance: Distance,
}

/// One ranked result from a similarity query.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub payload: serde_json::Value,
    pub score: f32,
}

impl SearchHit {
    /// The stored document text, or `""` when the payload has none.
    pub fn document(&self) -> &str {
        self.payload
            .get("document")
            .and_then(|d| d.as_str())
            .unwrap_or_default()
    }

    /// A metadata field rendered as a string, if present.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.payload
            .get("metadata")
            .and_then(|m| m.get(key))
            .and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FileMetadata {
        FileMetadata {
            project: "demo".to_string(),
            absolute_path: "/work/demo/src/a.txt".to_string(),
            relative_path: "src/a.txt".to_string(),
            filename: "a.txt".to_string(),
            extension: "txt".to_string(),
            size_bytes: 5,
            modified_at: Some("2024-01-02T03:04:05".to_string()),
            timestamp: None,
        }
    }

    #[test]
    fn fields_are_key_ordered_and_skip_absent_optionals() {
        let fields = sample().fields();
        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "absolute_path",
                "extension",
                "filename",
                "modified_at",
                "project",
                "relative_path",
                "size_bytes"
            ]
        );
        assert_eq!(fields["size_bytes"], "5");
    }

    #[test]
    fn payload_nests_metadata_under_document() {
        let record = DocumentRecord {
            id: "abc".to_string(),
            metadata: sample(),
            content: "hello".to_string(),
        };
        let payload = record.payload();
        assert_eq!(payload["document"], "hello");
        assert_eq!(payload["metadata"]["relative_path"], "src/a.txt");
        assert!(payload["metadata"].get("timestamp").is_none());
    }

    #[test]
    fn search_hit_accessors() {
        let hit = SearchHit {
            id: "x".to_string(),
            payload: serde_json::json!({"document": "body", "metadata": {"relative_path": "r.md"}}),
            score: 0.5,
        };
        assert_eq!(hit.document(), "body");
        assert_eq!(hit.metadata_str("relative_path"), Some("r.md"));
        assert_eq!(hit.metadata_str("missing"), None);
    }
}
