//! Error types for status sources.

use std::path::PathBuf;

/// Result type alias for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("lease file not found: {path} (also tried {fallback})")]
    LeaseFileMissing { path: PathBuf, fallback: PathBuf },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
