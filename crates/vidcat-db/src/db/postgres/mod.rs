//! PostgreSQL implementation of the catalog seam
//!
//! [`PgCatalog`] opens one sqlx transaction per lifecycle operation and
//! [`PgTransaction`] runs every statement of that operation on it.

mod comment;
mod tag;
mod video;

pub use comment::CommentRepository;
pub use video::VideoRepository;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use vidcat_core::models::{BlobRefs, NewVideoRow, Tag, TagId, VideoId, VideoRowUpdate};
use vidcat_core::StoreError;

use super::catalog::{CatalogStore, CatalogTransaction};

#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CatalogStore for PgCatalog {
    type Tx = PgTransaction;

    async fn begin(&self) -> Result<PgTransaction, StoreError> {
        let transaction = self.pool.begin().await?;
        Ok(PgTransaction {
            transaction: Some(transaction),
        })
    }
}

/// One open PostgreSQL transaction.
///
/// Dropping it without `commit` or `rollback` rolls back when the connection
/// returns to the pool.
pub struct PgTransaction {
    transaction: Option<Transaction<'static, Postgres>>,
}

impl PgTransaction {
    fn conn(&mut self) -> Result<&mut PgConnection, StoreError> {
        self.transaction.as_deref_mut().ok_or_else(|| {
            StoreError::Backend("Transaction was already committed or rolled back".to_string())
        })
    }
}

#[async_trait]
impl CatalogTransaction for PgTransaction {
    async fn insert_video(&mut self, row: &NewVideoRow) -> Result<VideoId, StoreError> {
        video::insert(self.conn()?, row).await
    }

    async fn update_video(&mut self, row: &VideoRowUpdate) -> Result<bool, StoreError> {
        video::update(self.conn()?, row).await
    }

    async fn delete_video(&mut self, video_id: VideoId) -> Result<bool, StoreError> {
        video::delete(self.conn()?, video_id).await
    }

    async fn select_blob_refs(
        &mut self,
        video_id: VideoId,
    ) -> Result<Option<BlobRefs>, StoreError> {
        video::select_blob_refs_for_update(self.conn()?, video_id).await
    }

    async fn blob_key_in_use(&mut self, key: &str) -> Result<bool, StoreError> {
        video::key_in_use(self.conn()?, key).await
    }

    async fn upsert_tags(&mut self, names: &[String]) -> Result<Vec<Tag>, StoreError> {
        tag::upsert(self.conn()?, names).await
    }

    async fn clear_video_tags(&mut self, video_id: VideoId) -> Result<u64, StoreError> {
        tag::clear_links(self.conn()?, video_id).await
    }

    async fn link_video_tags(
        &mut self,
        video_id: VideoId,
        tag_ids: &[TagId],
    ) -> Result<u64, StoreError> {
        tag::link(self.conn()?, video_id, tag_ids).await
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        if let Some(tx) = self.transaction.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), StoreError> {
        if let Some(tx) = self.transaction.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}

impl Drop for PgTransaction {
    fn drop(&mut self) {
        if self.transaction.is_some() {
            tracing::warn!(
                "Transaction was dropped without explicit commit or rollback - rolling back"
            );
        }
    }
}
