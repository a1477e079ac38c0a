//! Deterministic record identity.
//!
//! A record id is the MD5 digest of the file's identity metadata, rendered as
//! 32 lowercase hex characters. The same `(project, absolute_path)` pair
//! always yields the same id, so re-indexing overwrites instead of
//! duplicating. Qdrant accepts the 32-hex form as a UUID point id.
//!
//! When the identity pair is incomplete the id falls back to the remaining
//! metadata. That fallback usually carries a timestamp salt and is therefore
//! *not* stable across runs.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::{FileMetadata, ABSOLUTE_PATH_KEY, FILENAME_KEY, PROJECT_KEY};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("insufficient metadata to derive a deterministic id")]
    InsufficientMetadata,
    /// The path cannot be represented exactly as UTF-8; a lossy form could
    /// collide with another file's id.
    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(String),
}

/// MD5 of `input` as 32 lowercase hex characters.
pub fn digest(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

/// Resolve the record id for a file's metadata.
pub fn resolve_id(metadata: &FileMetadata) -> Result<String, IdentityError> {
    resolve_id_from_fields(&metadata.fields())
}

/// Resolve an id from arbitrary `key -> value` metadata.
///
/// - `project` and `absolute_path` both non-empty: digest of
///   `"{project}:{absolute_path}"`.
/// - otherwise: digest of `file:{filename};` (when a filename is present)
///   followed by `key:value;` for every other non-empty field in key order.
pub fn resolve_id_from_fields(fields: &BTreeMap<String, String>) -> Result<String, IdentityError> {
    let project = fields.get(PROJECT_KEY).map(String::as_str).unwrap_or("");
    let absolute_path = fields
        .get(ABSOLUTE_PATH_KEY)
        .map(String::as_str)
        .unwrap_or("");

    if !project.is_empty() && !absolute_path.is_empty() {
        return Ok(digest(&format!("{}:{}", project, absolute_path)));
    }

    let mut key = String::new();
    if let Some(filename) = fields.get(FILENAME_KEY).filter(|f| !f.is_empty()) {
        key.push_str(&format!("file:{};", filename));
    }
    for (name, value) in fields {
        if matches!(name.as_str(), PROJECT_KEY | ABSOLUTE_PATH_KEY | FILENAME_KEY) {
            continue;
        }
        if value.is_empty() {
            continue;
        }
        key.push_str(&format!("{}:{};", name, value));
    }

    if key.is_empty() {
        return Err(IdentityError::InsufficientMetadata);
    }
    Ok(digest(&key))
}
