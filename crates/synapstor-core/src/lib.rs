//! # synapstor-core
//!
//! I/O-free building blocks for `synapstor-index`: the document model,
//! deterministic identity derivation, and the [`embedding::EmbeddingProvider`]
//! and [`store::VectorStore`] traits the indexing pipeline is written against.
//!
//! This crate does no filesystem or network access. Concrete providers and the
//! Qdrant adapter live in the `synapstor-index` app crate; an in-memory store
//! lives here for tests and dry runs.

pub mod embedding;
pub mod identity;
pub mod models;
pub mod store;
