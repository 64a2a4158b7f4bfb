use sqlx::{PgPool, Postgres};
use vidcat_core::models::{Comment, NewComment, VideoId};
use vidcat_core::StoreError;

/// Repository for video comments
///
/// Comments have no blob-store side and are removed by cascade when their
/// video row is deleted.
#[derive(Clone)]
pub struct CommentRepository {
    pool: PgPool,
}

impl CommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Add a comment. Returns `None` when the video does not exist.
    #[tracing::instrument(skip(self, comment), fields(db.table = "comments", db.operation = "insert", video_id = %comment.video_id))]
    pub async fn add_comment(&self, comment: &NewComment) -> Result<Option<Comment>, StoreError> {
        let created = sqlx::query_as::<Postgres, Comment>(
            r#"
            INSERT INTO comments (video_id, content)
            SELECT id, $2 FROM videos WHERE id = $1
            RETURNING comment_id, video_id, content, created_at
            "#,
        )
        .bind(comment.video_id)
        .bind(comment.content.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(created)
    }

    /// List a video's comments, newest first.
    #[tracing::instrument(skip(self), fields(db.table = "comments", db.operation = "select", video_id = %video_id))]
    pub async fn list_comments(&self, video_id: VideoId) -> Result<Vec<Comment>, StoreError> {
        let comments = sqlx::query_as::<Postgres, Comment>(
            r#"
            SELECT comment_id, video_id, content, created_at
            FROM comments
            WHERE video_id = $1
            ORDER BY created_at DESC, comment_id DESC
            "#,
        )
        .bind(video_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }
}
