//! Typed errors for the indexing run.
//!
//! [`IndexError::Setup`] aborts the run before any file is processed. The
//! per-file variants carry the relative path and are folded into the
//! `failed` counter; they never stop the batch.

use std::fmt;

use synapstor_core::identity::IdentityError;
use thiserror::Error;

/// The per-file step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Read,
    Identity,
    Embed,
    Upsert,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Read => "read",
            Stage::Identity => "identity",
            Stage::Embed => "embed",
            Stage::Upsert => "upsert",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum IndexError {
    /// Store unreachable, provider unavailable, bad project path, or
    /// collection provisioning failure.
    #[error("setup failed: {0:#}")]
    Setup(anyhow::Error),

    #[error("{path}: read failed: {reason}")]
    Read { path: String, reason: String },

    #[error("{path}: {source}")]
    Identity {
        path: String,
        #[source]
        source: IdentityError,
    },

    #[error("{path}: embedding failed: {reason}")]
    Embed { path: String, reason: String },

    #[error("{path}: upsert failed: {reason}")]
    Upsert { path: String, reason: String },

    #[error("indexing interrupted after {processed} of {eligible} eligible files")]
    Interrupted { processed: u64, eligible: u64 },

    #[error("interrupted before indexing started")]
    SetupInterrupted,
}

impl IndexError {
    pub fn setup(err: impl Into<anyhow::Error>) -> Self {
        IndexError::Setup(err.into())
    }

    /// The failing per-file stage, or `None` for run-level errors.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            IndexError::Read { .. } => Some(Stage::Read),
            IndexError::Identity { .. } => Some(Stage::Identity),
            IndexError::Embed { .. } => Some(Stage::Embed),
            IndexError::Upsert { .. } => Some(Stage::Upsert),
            IndexError::Setup(_)
            | IndexError::Interrupted { .. }
            | IndexError::SetupInterrupted => None,
        }
    }

    /// Relative path of the file the error is scoped to.
    pub fn path(&self) -> Option<&str> {
        match self {
            IndexError::Read { path, .. }
            | IndexError::Identity { path, .. }
            | IndexError::Embed { path, .. }
            | IndexError::Upsert { path, .. } => Some(path),
            IndexError::Setup(_)
            | IndexError::Interrupted { .. }
            | IndexError::SetupInterrupted => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels() {
        assert_eq!(Stage::Read.to_string(), "read");
        assert_eq!(Stage::Identity.to_string(), "identity");
        assert_eq!(Stage::Embed.to_string(), "embed");
        assert_eq!(Stage::Upsert.to_string(), "upsert");
    }

    #[test]
    fn test_file_errors_carry_path_and_stage() {
        let err = IndexError::Embed {
            path: "src/lib.rs".to_string(),
            reason: "timeout".to_string(),
        };
        assert_eq!(err.stage(), Some(Stage::Embed));
        assert_eq!(err.path(), Some("src/lib.rs"));
        assert_eq!(err.to_string(), "src/lib.rs: embedding failed: timeout");

        let err = IndexError::Identity {
            path: "x".to_string(),
            source: IdentityError::InsufficientMetadata,
        };
        assert_eq!(err.stage(), Some(Stage::Identity));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_setup_error_has_no_stage() {
        let err = IndexError::setup(anyhow::anyhow!("connection refused"));
        assert_eq!(err.stage(), None);
        assert_eq!(err.path(), None);
        assert!(err.to_string().contains("connection refused"));
    }
}
