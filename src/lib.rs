//! # Synapstor Index
//!
//! Indexes a project's text files into a vector store for semantic retrieval.
//!
//! Every file gets a deterministic id derived from its project name and
//! absolute path, so indexing the same project again overwrites records
//! instead of duplicating them.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │ Discovery │──▶│   Filter    │──▶│  Per-file    │──▶│  Vector  │
//! │ (walkdir) │   │ ignore/size │   │ read+id+embed│   │  store   │
//! └───────────┘   └─────────────┘   └──────────────┘   └──────────┘
//!                                     sequential or
//!                                     worker pool
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! synapstor-index --project demo --path ./demo
//! synapstor-index -p demo -d ./demo --workers 8 --query "where is auth handled?"
//! synapstor-index -p demo -d ./demo --store memory --embedding-provider ollama \
//!     --embedding-model nomic-embed-text --config ./synapstor.toml
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`error`] | Typed run and per-file errors |
//! | [`discovery`] | Project walk and eligibility filtering |
//! | [`ignore_filter`] | Gitignore-style exclusion rules |
//! | [`sniff`] | Binary-content heuristics |
//! | [`encoding`] | Encoding-fallback file reading |
//! | [`metadata`] | Per-file metadata extraction |
//! | [`embedding`] | Local, OpenAI and Ollama embedding providers |
//! | [`qdrant`] | Qdrant REST store adapter |
//! | [`store`] | Store backend selection |
//! | [`collection`] | Collection provisioning and vector-field resolution |
//! | [`pipeline`] | Run orchestration, worker pool, cancellation |
//! | [`stats`] | Run statistics and summary |
//! | [`progress`] | Progress reporting on stderr |
//! | [`search`] | Post-index semantic query |
//!
//! Data model, identity derivation and the provider/store traits live in the
//! `synapstor-core` crate.

pub mod collection;
pub mod config;
pub mod discovery;
pub mod embedding;
pub mod encoding;
pub mod error;
pub mod ignore_filter;
pub mod metadata;
pub mod pipeline;
pub mod progress;
pub mod qdrant;
pub mod search;
pub mod sniff;
pub mod stats;
pub mod store;
