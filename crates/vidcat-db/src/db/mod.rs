//! Relational side of the video lifecycle
//!
//! `catalog` defines the transaction seam, `transaction` scopes one lifecycle
//! operation over it, and `tags`/`blob_refs` hold the statements every flow
//! shares. `postgres` is the production implementation.
//
// Transaction seam and coordinator
pub mod catalog;
pub mod transaction;
//
// Statement groups run inside a lifecycle transaction
pub mod blob_refs;
pub mod tags;
//
// PostgreSQL implementation and read repositories
pub mod postgres;

pub use blob_refs::{resolve_blob_refs, stale_fields};
pub use catalog::{CatalogStore, CatalogTransaction, COVER_KEY_CONSTRAINT, VIDEO_KEY_CONSTRAINT};
pub use postgres::{CommentRepository, PgCatalog, PgTransaction, VideoRepository};
pub use tags::{reconcile_tags, LinkMode};
pub use transaction::TransactionScope;
