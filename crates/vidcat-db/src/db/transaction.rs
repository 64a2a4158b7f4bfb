//! Transaction coordination for lifecycle operations
//!
//! [`TransactionScope`] wraps one [`CatalogTransaction`] for the duration of a
//! single create, update or delete. It guarantees that a failed statement is
//! followed by a rollback attempt and that the statement's error, not the
//! rollback's, is what reaches the caller.

use std::fmt;

use super::catalog::{CatalogStore, CatalogTransaction};
use vidcat_core::StoreError;

pub struct TransactionScope<T: CatalogTransaction> {
    tx: T,
    operation: &'static str,
}

impl<T: CatalogTransaction> TransactionScope<T> {
    /// Begin a new transaction for `operation` (used in log fields).
    pub async fn begin<S>(store: &S, operation: &'static str) -> Result<Self, StoreError>
    where
        S: CatalogStore<Tx = T>,
    {
        let tx = store.begin().await.map_err(|e| {
            tracing::error!(error = %e, operation, "Failed to begin transaction");
            e
        })?;
        tracing::debug!(operation, "Transaction started");
        Ok(Self { tx, operation })
    }

    /// Handle for running statements inside the scope.
    pub fn tx(&mut self) -> &mut T {
        &mut self.tx
    }

    /// Commit the transaction. This is the only point at which the operation
    /// becomes visible.
    pub async fn commit(self) -> Result<(), StoreError> {
        let operation = self.operation;
        self.tx.commit().await.map_err(|e| {
            tracing::error!(error = %e, operation, "Failed to commit transaction");
            e
        })?;
        tracing::debug!(operation, "Transaction committed");
        Ok(())
    }

    /// Roll back explicitly.
    pub async fn rollback(self) -> Result<(), StoreError> {
        let operation = self.operation;
        self.tx.rollback().await?;
        tracing::debug!(operation, "Transaction rolled back");
        Ok(())
    }

    /// Roll back after `original` stopped the operation, then hand `original` back.
    ///
    /// A rollback failure is logged alongside the original error and otherwise
    /// swallowed.
    pub async fn abort<E: fmt::Display>(self, original: E) -> E {
        let operation = self.operation;
        match self.tx.rollback().await {
            Ok(()) => {
                tracing::info!(operation, error = %original, "Transaction rolled back after failure");
            }
            Err(rollback_err) => {
                tracing::error!(
                    operation,
                    error = %rollback_err,
                    original_error = %original,
                    "Failed to rollback transaction"
                );
            }
        }
        original
    }
}
