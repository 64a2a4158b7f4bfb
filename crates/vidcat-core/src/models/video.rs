use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tag::Tag;

pub type VideoId = i64;

/// A committed video metadata row.
///
/// `cover_key` and `video_key` name objects in the blob store. Both are unique
/// across all videos.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Video {
    pub id: VideoId,
    pub title: String,
    pub description: Option<String>,
    pub cover_key: String,
    pub video_key: String,
    pub upload_date: DateTime<Utc>,
    pub views_count: i64,
}

/// A video together with the tags linked to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoDetails {
    #[serde(flatten)]
    pub video: Video,
    pub tags: Vec<Tag>,
}

/// Blob keys a video row currently references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BlobRefs {
    pub cover_key: String,
    pub video_key: String,
}

impl BlobRefs {
    pub fn keys(&self) -> Vec<String> {
        vec![self.cover_key.clone(), self.video_key.clone()]
    }
}

/// Column values for inserting a video row.
#[derive(Debug, Clone)]
pub struct NewVideoRow {
    pub title: String,
    pub description: Option<String>,
    pub cover_key: String,
    pub video_key: String,
}

/// Column values for a full metadata rewrite of an existing row.
#[derive(Debug, Clone)]
pub struct VideoRowUpdate {
    pub id: VideoId,
    pub title: String,
    pub description: Option<String>,
    pub cover_key: String,
    pub video_key: String,
}
