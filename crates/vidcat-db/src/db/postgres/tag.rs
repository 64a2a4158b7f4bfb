use sqlx::{PgConnection, Postgres};
use vidcat_core::models::{Tag, TagId, VideoId};
use vidcat_core::StoreError;

/// Insert-or-return in one statement.
///
/// `DO UPDATE` with a no-op assignment makes `RETURNING` yield rows that
/// already existed or were committed by a concurrent transaction first, so
/// there is no separate lookup to race against. Postgres refuses to update the
/// same row twice in one statement, which is why callers pass distinct names.
///
/// Rows are inserted, and therefore locked, in name order. Two transactions
/// upserting overlapping names in different caller order would otherwise
/// deadlock on each other's row locks.
#[tracing::instrument(skip(conn, names), fields(db.table = "tags", db.operation = "upsert", tag_count = names.len()))]
pub(super) async fn upsert(
    conn: &mut PgConnection,
    names: &[String],
) -> Result<Vec<Tag>, StoreError> {
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let tags = sqlx::query_as::<Postgres, Tag>(
        r#"
        INSERT INTO tags (tag_name)
        SELECT n FROM UNNEST($1::text[]) AS u(n) ORDER BY n
        ON CONFLICT (tag_name) DO UPDATE SET tag_name = EXCLUDED.tag_name
        RETURNING tag_id, tag_name
        "#,
    )
    .bind(names)
    .fetch_all(conn)
    .await?;

    Ok(tags)
}

#[tracing::instrument(skip(conn), fields(db.table = "video_tags", db.operation = "delete", db.record_id = %video_id))]
pub(super) async fn clear_links(
    conn: &mut PgConnection,
    video_id: VideoId,
) -> Result<u64, StoreError> {
    let result = sqlx::query("DELETE FROM video_tags WHERE video_id = $1")
        .bind(video_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}

#[tracing::instrument(skip(conn, tag_ids), fields(db.table = "video_tags", db.operation = "insert", db.record_id = %video_id))]
pub(super) async fn link(
    conn: &mut PgConnection,
    video_id: VideoId,
    tag_ids: &[TagId],
) -> Result<u64, StoreError> {
    if tag_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"
        INSERT INTO video_tags (video_id, tag_id)
        SELECT $1, UNNEST($2::bigint[])
        ON CONFLICT (video_id, tag_id) DO NOTHING
        "#,
    )
    .bind(video_id)
    .bind(tag_ids)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}
