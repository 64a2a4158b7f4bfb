//! Tag reconciliation
//!
//! Turns a submitted list of tag names into tag ids and makes the video's
//! junction rows match that list exactly. Runs inside the caller's
//! transaction; it never commits.

use std::collections::HashMap;

use vidcat_core::models::{TagId, VideoId};
use vidcat_core::validation::normalize_tag_names;
use vidcat_core::StoreError;

use super::catalog::CatalogTransaction;

/// How existing junction rows are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    /// Fresh video: there are no links to remove.
    Append,
    /// Existing video: drop every link, then insert the new set.
    Replace,
}

/// Reconcile `names` for `video_id` and return tag ids in first-occurrence order.
#[tracing::instrument(skip(tx, names), fields(video_id = %video_id, mode = ?mode))]
pub async fn reconcile_tags<T>(
    tx: &mut T,
    video_id: VideoId,
    names: &[String],
    mode: LinkMode,
) -> Result<Vec<TagId>, StoreError>
where
    T: CatalogTransaction,
{
    let names = normalize_tag_names(names);

    if mode == LinkMode::Replace {
        let removed = tx.clear_video_tags(video_id).await?;
        tracing::debug!(video_id, removed, "Cleared existing tag links");
    }

    if names.is_empty() {
        return Ok(Vec::new());
    }

    let tags = tx.upsert_tags(&names).await?;
    let ids_by_name: HashMap<&str, TagId> = tags
        .iter()
        .map(|tag| (tag.tag_name.as_str(), tag.tag_id))
        .collect();

    let tag_ids = names
        .iter()
        .map(|name| {
            ids_by_name.get(name.as_str()).copied().ok_or_else(|| {
                StoreError::Backend(format!("Tag upsert returned no row for '{}'", name))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let linked = tx.link_video_tags(video_id, &tag_ids).await?;
    tracing::debug!(video_id, tag_count = tag_ids.len(), linked, "Linked tags");

    Ok(tag_ids)
}
