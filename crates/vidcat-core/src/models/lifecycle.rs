//! Inputs and outcomes of the create/update/delete lifecycle flows.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::compensation::FailedDeletion;
use super::tag::TagId;
use super::video::{NewVideoRow, VideoId, VideoRowUpdate};
use crate::validation::{not_blank, replacement_key, storage_key};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVideoRequest {
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[validate(custom(function = "storage_key"))]
    pub cover_key: String,
    #[validate(custom(function = "storage_key"))]
    pub video_key: String,
}

impl CreateVideoRequest {
    pub fn to_row(&self) -> NewVideoRow {
        NewVideoRow {
            title: self.title.clone(),
            description: self.description.clone(),
            cover_key: self.cover_key.clone(),
            video_key: self.video_key.clone(),
        }
    }

    /// Keys the client uploaded before calling create.
    pub fn uploaded_keys(&self) -> Vec<String> {
        vec![self.cover_key.clone(), self.video_key.clone()]
    }
}

/// Full metadata rewrite of an existing video.
///
/// The old keys are mandatory even when unchanged: they are what gets deleted
/// from the blob store once the new row is committed.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVideoRequest {
    #[validate(range(min = 1))]
    pub video_id: VideoId,
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[validate(custom(function = "replacement_key"))]
    pub new_cover_key: Option<String>,
    #[validate(custom(function = "replacement_key"))]
    pub new_video_key: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub old_cover_key: String,
    #[validate(custom(function = "not_blank"))]
    pub old_video_key: String,
}

/// A replacement key counts as supplied only when it is non-blank.
fn supplied(key: &Option<String>) -> Option<&str> {
    key.as_deref().filter(|k| !k.trim().is_empty())
}

impl UpdateVideoRequest {
    pub fn effective_cover_key(&self) -> &str {
        supplied(&self.new_cover_key).unwrap_or(&self.old_cover_key)
    }

    pub fn effective_video_key(&self) -> &str {
        supplied(&self.new_video_key).unwrap_or(&self.old_video_key)
    }

    pub fn to_row(&self) -> VideoRowUpdate {
        VideoRowUpdate {
            id: self.video_id,
            title: self.title.clone(),
            description: self.description.clone(),
            cover_key: self.effective_cover_key().to_string(),
            video_key: self.effective_video_key().to_string(),
        }
    }

    /// Old keys to delete after commit: those with a supplied replacement that differs.
    pub fn superseded_keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(2);
        if let Some(new_cover) = supplied(&self.new_cover_key) {
            if new_cover != self.old_cover_key {
                keys.push(self.old_cover_key.clone());
            }
        }
        if let Some(new_video) = supplied(&self.new_video_key) {
            if new_video != self.old_video_key {
                keys.push(self.old_video_key.clone());
            }
        }
        keys
    }

    /// Newly uploaded replacement keys; orphans if the update never commits.
    pub fn replacement_keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(2);
        if let Some(new_cover) = supplied(&self.new_cover_key) {
            if new_cover != self.old_cover_key {
                keys.push(new_cover.to_string());
            }
        }
        if let Some(new_video) = supplied(&self.new_video_key) {
            if new_video != self.old_video_key {
                keys.push(new_video.to_string());
            }
        }
        keys
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedVideo {
    pub video_id: VideoId,
    pub tag_ids: Vec<TagId>,
}

/// Result of a committed update.
///
/// `pending_cleanup` is non-empty when old blobs could not be removed; the
/// metadata change stands regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedVideo {
    pub video_id: VideoId,
    pub cleaned_keys: Vec<String>,
    pub pending_cleanup: Vec<FailedDeletion>,
}

impl UpdatedVideo {
    pub fn is_cleanup_complete(&self) -> bool {
        self.pending_cleanup.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedVideo {
    pub video_id: VideoId,
    pub cleaned_keys: Vec<String>,
    pub pending_cleanup: Vec<FailedDeletion>,
}

impl DeletedVideo {
    pub fn is_cleanup_complete(&self) -> bool {
        self.pending_cleanup.is_empty()
    }
}
