//! Collaborator errors.

use common::SafeViewError;
use thiserror::Error;

/// Browser-storage failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Stored value for '{key}' is malformed: {message}")]
    Corrupt { key: String, message: String },
}

/// Metadata lookup failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("Video not found: {0}")]
    NotFound(String),

    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl From<StorageError> for SafeViewError {
    fn from(err: StorageError) -> Self {
        SafeViewError::storage(err.to_string())
    }
}

impl From<MetadataError> for SafeViewError {
    fn from(err: MetadataError) -> Self {
        SafeViewError::metadata(err.to_string())
    }
}
