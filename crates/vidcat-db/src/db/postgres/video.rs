use sqlx::{PgConnection, PgPool, Postgres};
use vidcat_core::models::{BlobRefs, NewVideoRow, Tag, Video, VideoDetails, VideoId, VideoRowUpdate};
use vidcat_core::StoreError;

#[tracing::instrument(skip(conn, row), fields(db.table = "videos", db.operation = "insert"))]
pub(super) async fn insert(
    conn: &mut PgConnection,
    row: &NewVideoRow,
) -> Result<VideoId, StoreError> {
    let id = sqlx::query_scalar::<Postgres, VideoId>(
        r#"
        INSERT INTO videos (title, description, cover_key, video_key)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(&row.title)
    .bind(&row.description)
    .bind(&row.cover_key)
    .bind(&row.video_key)
    .fetch_one(conn)
    .await?;

    Ok(id)
}

#[tracing::instrument(skip(conn, row), fields(db.table = "videos", db.operation = "update", db.record_id = %row.id))]
pub(super) async fn update(
    conn: &mut PgConnection,
    row: &VideoRowUpdate,
) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE videos
        SET title = $2, description = $3, cover_key = $4, video_key = $5,
            upload_date = CURRENT_TIMESTAMP
        WHERE id = $1
        "#,
    )
    .bind(row.id)
    .bind(&row.title)
    .bind(&row.description)
    .bind(&row.cover_key)
    .bind(&row.video_key)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[tracing::instrument(skip(conn), fields(db.table = "videos", db.operation = "delete", db.record_id = %video_id))]
pub(super) async fn delete(
    conn: &mut PgConnection,
    video_id: VideoId,
) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM videos WHERE id = $1")
        .bind(video_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Row lock keeps a concurrent update from swapping keys between the read and
/// the commit.
#[tracing::instrument(skip(conn), fields(db.table = "videos", db.operation = "select", db.record_id = %video_id))]
pub(super) async fn select_blob_refs_for_update(
    conn: &mut PgConnection,
    video_id: VideoId,
) -> Result<Option<BlobRefs>, StoreError> {
    let refs = sqlx::query_as::<Postgres, BlobRefs>(
        "SELECT cover_key, video_key FROM videos WHERE id = $1 FOR UPDATE",
    )
    .bind(video_id)
    .fetch_optional(conn)
    .await?;

    Ok(refs)
}

#[tracing::instrument(skip(conn), fields(db.table = "videos", db.operation = "select"))]
pub(super) async fn key_in_use(conn: &mut PgConnection, key: &str) -> Result<bool, StoreError> {
    let in_use = sqlx::query_scalar::<Postgres, bool>(
        "SELECT EXISTS (SELECT 1 FROM videos WHERE cover_key = $1 OR video_key = $1)",
    )
    .bind(key)
    .fetch_one(conn)
    .await?;

    Ok(in_use)
}

/// Read-only queries over committed videos.
#[derive(Clone)]
pub struct VideoRepository {
    pool: PgPool,
}

impl VideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a video and its tags, ordered by tag name.
    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "select", db.record_id = %video_id))]
    pub async fn get_video(&self, video_id: VideoId) -> Result<Option<VideoDetails>, StoreError> {
        let video = sqlx::query_as::<Postgres, Video>(
            r#"
            SELECT id, title, description, cover_key, video_key, upload_date, views_count
            FROM videos
            WHERE id = $1
            "#,
        )
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(video) = video else {
            return Ok(None);
        };

        let tags = sqlx::query_as::<Postgres, Tag>(
            r#"
            SELECT t.tag_id, t.tag_name
            FROM tags t
            JOIN video_tags vt ON vt.tag_id = t.tag_id
            WHERE vt.video_id = $1
            ORDER BY t.tag_name ASC
            "#,
        )
        .bind(video_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(VideoDetails { video, tags }))
    }
}
