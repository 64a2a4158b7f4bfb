//! vidcat core library
//!
//! Domain models, error types, configuration and validation shared by every
//! vidcat crate.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel, StoreError};
pub use storage_types::StorageBackend;
