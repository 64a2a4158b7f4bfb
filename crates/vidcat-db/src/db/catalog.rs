//! Relational store seam used by the lifecycle flows.
//!
//! A [`CatalogStore`] hands out one [`CatalogTransaction`] per lifecycle
//! operation. Every statement of that operation runs through the same
//! transaction handle, and nothing is visible to other sessions until
//! [`CatalogTransaction::commit`] succeeds.

use async_trait::async_trait;
use vidcat_core::models::{BlobRefs, NewVideoRow, Tag, TagId, VideoId, VideoRowUpdate};
use vidcat_core::StoreError;

/// Unique constraint on `videos.video_key`.
pub const VIDEO_KEY_CONSTRAINT: &str = "videos_video_key_key";
/// Unique constraint on `videos.cover_key`.
pub const COVER_KEY_CONSTRAINT: &str = "videos_cover_key_key";

#[async_trait]
pub trait CatalogStore: Send + Sync {
    type Tx: CatalogTransaction;

    /// Open a transaction scope for one lifecycle operation.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

#[async_trait]
pub trait CatalogTransaction: Send {
    /// Insert a video row and return its new id.
    async fn insert_video(&mut self, row: &NewVideoRow) -> Result<VideoId, StoreError>;

    /// Rewrite title, description and keys of a row and refresh `upload_date`.
    /// Returns false when no row has that id.
    async fn update_video(&mut self, row: &VideoRowUpdate) -> Result<bool, StoreError>;

    /// Delete a video row. Junction and comment rows go with it by cascade.
    /// Returns false when no row has that id.
    async fn delete_video(&mut self, video_id: VideoId) -> Result<bool, StoreError>;

    /// Read the blob keys of a row and lock it until the transaction ends.
    async fn select_blob_refs(&mut self, video_id: VideoId)
        -> Result<Option<BlobRefs>, StoreError>;

    /// True when any row names `key` as its cover or video key.
    async fn blob_key_in_use(&mut self, key: &str) -> Result<bool, StoreError>;

    /// Create missing tags and return the rows for every requested name.
    ///
    /// Names must already be distinct. A name inserted concurrently by another
    /// transaction is returned, not reported as a violation.
    async fn upsert_tags(&mut self, names: &[String]) -> Result<Vec<Tag>, StoreError>;

    /// Remove every junction row of a video.
    async fn clear_video_tags(&mut self, video_id: VideoId) -> Result<u64, StoreError>;

    /// Link tags to a video; pairs that already exist are skipped.
    async fn link_video_tags(
        &mut self,
        video_id: VideoId,
        tag_ids: &[TagId],
    ) -> Result<u64, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}
