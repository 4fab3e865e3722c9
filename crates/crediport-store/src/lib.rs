//! On-disk artifact store for generated credit-report PDFs.
//!
//! Callers address artifacts exclusively through [`ArtifactKey`] (a normalized
//! DNI); the store owns the directory layout, the allow-listed filename
//! pattern, atomic writes, and age-based eviction.

mod keys;
mod store;

use thiserror::Error;

pub use keys::ArtifactKey;
pub use store::{ArtifactRef, ArtifactStore};

/// Store operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid DNI: {0}")]
    InvalidDni(String),

    #[error("Invalid artifact filename: {0}")]
    InvalidFilename(String),

    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
