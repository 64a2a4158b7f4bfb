//! Blob-store compensation
//!
//! Deletes blobs whose fate was decided by a relational outcome: old keys after
//! a committed update, both keys after a committed delete, uploaded keys after
//! an aborted create. Every key is attempted; one failure never stops the rest.

use std::sync::Arc;

use vidcat_core::models::{CompensationReport, FailedDeletion};
use vidcat_storage::{Storage, StorageError};

#[derive(Clone)]
pub struct CompensationExecutor {
    storage: Arc<dyn Storage>,
    concurrency: usize,
}

impl CompensationExecutor {
    pub fn new(storage: Arc<dyn Storage>, concurrency: usize) -> Self {
        Self {
            storage,
            concurrency: concurrency.max(1),
        }
    }

    /// Delete `keys` and report the outcome of each one.
    ///
    /// A key that is already gone counts as deleted: compensation only has to
    /// make sure the blob no longer exists.
    #[tracing::instrument(skip(self, keys), fields(compensation.key_count = keys.len()))]
    pub async fn execute(&self, keys: &[String]) -> CompensationReport {
        let mut report = CompensationReport::default();
        if keys.is_empty() {
            return report;
        }

        let outcomes = self.storage.delete_batch(keys, self.concurrency).await;

        for (key, result) in outcomes {
            match result {
                Ok(()) => {
                    tracing::info!(storage_key = %key, "Deleted blob");
                    report.deleted.push(key);
                }
                Err(StorageError::NotFound(_)) => {
                    tracing::debug!(storage_key = %key, "Blob already absent");
                    report.deleted.push(key);
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        storage_key = %key,
                        "Failed to delete blob, leaving it for operational cleanup"
                    );
                    report.failed.push(FailedDeletion {
                        key,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            backend = %self.storage.backend_type(),
            "Compensation finished"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidcat_storage::test_helpers::MockStorage;

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn deletes_every_key() {
        let storage = MockStorage::with_files(&["c1", "v1"]);
        let executor = CompensationExecutor::new(Arc::new(storage.clone()), 4);

        let report = executor.execute(&keys(&["c1", "v1"])).await;

        assert!(report.is_complete());
        assert_eq!(report.deleted, keys(&["c1", "v1"]));
        assert!(!storage.has_file("c1"));
        assert!(!storage.has_file("v1"));
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_others() {
        let storage = MockStorage::with_files(&["a", "b", "c"]);
        storage.fail_deletes_for("b");
        let executor = CompensationExecutor::new(Arc::new(storage.clone()), 1);

        let report = executor.execute(&keys(&["a", "b", "c"])).await;

        assert_eq!(report.deleted, keys(&["a", "c"]));
        assert_eq!(report.failed_keys(), keys(&["b"]));
        assert_eq!(storage.delete_calls(), keys(&["a", "b", "c"]));
        assert!(storage.has_file("b"));
    }

    #[tokio::test]
    async fn missing_blob_counts_as_deleted() {
        let storage = MockStorage::new();
        let executor = CompensationExecutor::new(Arc::new(storage), 2);

        let report = executor.execute(&keys(&["gone"])).await;

        assert!(report.is_complete());
        assert_eq!(report.deleted, keys(&["gone"]));
    }

    #[tokio::test]
    async fn empty_key_set_touches_nothing() {
        let storage = MockStorage::new();
        let executor = CompensationExecutor::new(Arc::new(storage.clone()), 2);

        let report = executor.execute(&[]).await;

        assert!(report.is_complete());
        assert!(storage.delete_calls().is_empty());
    }
}
