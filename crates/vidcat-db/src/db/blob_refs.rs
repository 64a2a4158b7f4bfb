//! Blob reference resolution
//!
//! Reads which blob keys a video row points at, inside the operation's
//! transaction, so the keys handed to compensation are the ones the committed
//! change actually released.

use vidcat_core::models::{BlobRefs, VideoId};
use vidcat_core::StoreError;

use super::catalog::CatalogTransaction;

/// Current keys of `video_id`, with the row locked, or `None` if it does not exist.
pub async fn resolve_blob_refs<T>(
    tx: &mut T,
    video_id: VideoId,
) -> Result<Option<BlobRefs>, StoreError>
where
    T: CatalogTransaction,
{
    let refs = tx.select_blob_refs(video_id).await?;
    match &refs {
        Some(refs) => tracing::debug!(
            video_id,
            cover_key = %refs.cover_key,
            video_key = %refs.video_key,
            "Resolved blob references"
        ),
        None => tracing::debug!(video_id, "No video row to resolve"),
    }
    Ok(refs)
}

/// Names of the stored keys that differ from what the caller expects.
pub fn stale_fields(
    current: &BlobRefs,
    expected_cover: &str,
    expected_video: &str,
) -> Vec<&'static str> {
    let mut stale = Vec::new();
    if current.cover_key != expected_cover {
        stale.push("cover_key");
    }
    if current.video_key != expected_video {
        stale.push("video_key");
    }
    stale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs() -> BlobRefs {
        BlobRefs {
            cover_key: "c1".to_string(),
            video_key: "v1".to_string(),
        }
    }

    #[test]
    fn matching_keys_are_not_stale() {
        assert!(stale_fields(&refs(), "c1", "v1").is_empty());
    }

    #[test]
    fn reports_each_mismatched_field() {
        assert_eq!(stale_fields(&refs(), "c0", "v1"), vec!["cover_key"]);
        assert_eq!(stale_fields(&refs(), "c0", "v0"), vec!["cover_key", "video_key"]);
    }
}
