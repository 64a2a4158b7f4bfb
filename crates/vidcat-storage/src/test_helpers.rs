//! In-memory blob store for unit tests
//!
//! Records every delete call and can be told to fail specific keys, so
//! compensation paths can be exercised without a real backend.

use crate::{Storage, StorageBackend, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Mock storage implementation that stores files in memory
#[derive(Clone, Default)]
pub struct MockStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    failing_keys: Arc<Mutex<HashSet<String>>>,
    delete_calls: Arc<Mutex<Vec<String>>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a set of keys with placeholder content.
    pub fn with_files(keys: &[&str]) -> Self {
        let storage = Self::new();
        for key in keys {
            storage.set_file(key, key.as_bytes().to_vec());
        }
        storage
    }

    /// Set a file in the mock storage
    pub fn set_file(&self, key: &str, data: Vec<u8>) {
        self.files.lock().unwrap().insert(key.to_string(), data);
    }

    /// Check if a file exists in the mock storage
    pub fn has_file(&self, key: &str) -> bool {
        self.files.lock().unwrap().contains_key(key)
    }

    /// Make every delete of `key` fail with a backend error.
    pub fn fail_deletes_for(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    /// Keys passed to `delete`, in call order.
    pub fn delete_calls(&self) -> Vec<String> {
        self.delete_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.delete_calls
            .lock()
            .unwrap()
            .push(storage_key.to_string());

        if self.failing_keys.lock().unwrap().contains(storage_key) {
            return Err(StorageError::DeleteFailed(format!(
                "injected failure for {}",
                storage_key
            )));
        }

        self.files
            .lock()
            .unwrap()
            .remove(storage_key)
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))?;
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
