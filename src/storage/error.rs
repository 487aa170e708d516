//! Storage error types

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while writing session files
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),

    #[error("Lock poisoned: {0}")]
    Poisoned(String),
}

impl StorageError {
    /// Wraps an IO error with the path it occurred on
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
