//! vidcat blob storage library
//!
//! The [`Storage`] trait abstracts the blob store that holds cover images and
//! video files. Objects are addressed by opaque keys chosen by the uploader;
//! the catalog only ever deletes them.
//!
//! Keys must not start with `/` or contain a `..` path segment.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{validate_key, DeleteOutcome, Storage, StorageError, StorageResult};
pub use vidcat_core::StorageBackend;
