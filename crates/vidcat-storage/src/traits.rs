//! Storage abstraction trait
//!
//! This module defines the Storage trait that all blob store backends implement.

use crate::StorageBackend;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use thiserror::Error;
use vidcat_core::validation::storage_key_problem;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of one key in a batch delete.
pub type DeleteOutcome = (String, StorageResult<()>);

/// Reject keys that could escape a backend's namespace.
///
/// Same rule the lifecycle requests are validated with, so every committed key
/// stays deletable.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    match storage_key_problem(storage_key) {
        Some(problem) => Err(StorageError::InvalidKey(problem.to_string())),
        None => Ok(()),
    }
}

/// Blob store abstraction
///
/// All backends (S3, local filesystem) implement this trait. Deletion is not
/// transactional: every call takes effect immediately and independently.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Delete a file by its storage key
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Delete several keys, reporting the result of each one.
    ///
    /// Every key is attempted regardless of earlier failures. Results come back
    /// in input order. At most `concurrency` deletes are in flight at once.
    async fn delete_batch(&self, storage_keys: &[String], concurrency: usize) -> Vec<DeleteOutcome> {
        stream::iter(storage_keys.iter().cloned())
            .map(|key| async move {
                let result = self.delete(&key).await;
                (key, result)
            })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
