//! vidcat services layer
//!
//! Hosts the lifecycle orchestration that keeps the relational catalog and the
//! blob store consistent, and re-exports the storage and catalog types callers
//! need to construct it.

pub mod compensation;
pub mod lifecycle;

pub use compensation::CompensationExecutor;
pub use lifecycle::{LifecycleOrchestrator, LifecycleState};
pub use vidcat_db::{CatalogStore, PgCatalog};
pub use vidcat_storage::{
    create_storage, LocalStorage, S3Storage, Storage, StorageBackend, StorageError, StorageResult,
};
