//! Collection provisioning and vector-field resolution.

use std::collections::BTreeSet;

use synapstor_core::embedding::EmbeddingProvider;
use synapstor_core::models::{CollectionDescriptor, Distance};
use synapstor_core::store::VectorStore;

use crate::error::{IndexError, Result};

/// What the run should do with the target collection.
#[derive(Debug, Clone, Default)]
pub struct CollectionRequest {
    pub name: String,
    /// Field name used on creation and preferred on introspection.
    pub vector_name: Option<String>,
    /// Drop and recreate the collection before indexing.
    pub recreate: bool,
}

/// Pick the field to write into from an existing collection's fields.
///
/// A single field is used as-is. With several, `preferred` wins when it is
/// one of them. Anything else is undecidable.
pub fn pick_vector_field(fields: &BTreeSet<String>, preferred: &str) -> Option<String> {
    if fields.len() == 1 {
        return fields.iter().next().cloned();
    }
    if fields.contains(preferred) {
        return Some(preferred.to_string());
    }
    None
}

/// Ensure the collection exists and decide which vector field to use.
///
/// Store errors while checking, deleting, or creating are setup failures.
/// Introspection of an existing collection is best effort: on failure the
/// canonical field name is used and the run continues.
pub async fn resolve_collection(
    store: &dyn VectorStore,
    provider: &dyn EmbeddingProvider,
    request: &CollectionRequest,
) -> Result<CollectionDescriptor> {
    let canonical = request
        .vector_name
        .clone()
        .unwrap_or_else(|| provider.vector_name().to_string());
    let vector_size = provider.vector_size();

    let mut exists = store
        .collection_exists(&request.name)
        .await
        .map_err(|e| IndexError::setup(e.context(format!("{} store unreachable", store.backend()))))?;

    if exists && request.recreate {
        tracing::info!(collection = %request.name, "recreating collection");
        store
            .delete_collection(&request.name)
            .await
            .map_err(IndexError::setup)?;
        exists = false;
    }

    if !exists {
        if vector_size == 0 {
            return Err(IndexError::setup(anyhow::anyhow!(
                "embedding provider '{}' reports a zero vector size",
                provider.model_name()
            )));
        }
        store
            .create_collection(&request.name, &canonical, vector_size, Distance::Cosine)
            .await
            .map_err(IndexError::setup)?;
        tracing::info!(
            collection = %request.name,
            vector_field = %canonical,
            vector_size,
            "created collection"
        );
        return Ok(CollectionDescriptor {
            name: request.name.clone(),
            vector_field: canonical,
            vector_size,
            distance: Distance::Cosine,
        });
    }

    let vector_field = match store.collection_vector_fields(&request.name).await {
        Ok(fields) => match pick_vector_field(&fields, &canonical) {
            Some(field) => field,
            None => {
                tracing::warn!(
                    collection = %request.name,
                    found = ?fields,
                    fallback = %canonical,
                    "no usable vector field in existing collection, using default"
                );
                canonical
            }
        },
        Err(e) => {
            tracing::warn!(
                collection = %request.name,
                error = %e,
                fallback = %canonical,
                "could not inspect existing collection, using default vector field"
            );
            canonical
        }
    };

    tracing::info!(collection = %request.name, vector_field = %vector_field, "using existing collection");
    Ok(CollectionDescriptor {
        name: request.name.clone(),
        vector_field,
        vector_size,
        distance: Distance::Cosine,
    })
}
