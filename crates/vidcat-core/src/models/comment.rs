use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::video::VideoId;
use crate::validation::not_blank;

pub type CommentId = i64;

/// A comment on a video. Removed with its video by `ON DELETE CASCADE`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Comment {
    pub comment_id: CommentId,
    pub video_id: VideoId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    #[validate(range(min = 1))]
    pub video_id: VideoId,
    #[validate(custom(function = "not_blank"), length(max = 2000))]
    pub content: String,
}
