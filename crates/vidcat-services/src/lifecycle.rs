//! Video lifecycle orchestration
//!
//! Sequences create, update and delete across the relational catalog and the
//! blob store. The catalog transaction decides the outcome; blob deletions run
//! only once that outcome is committed and never reverse it.
//!
//! ```text
//! Validating -> InTransaction -> Committed -> Reconciling -> Done
//!                     |
//!                     +--------> Aborted
//! ```

use std::fmt;

use validator::Validate;
use vidcat_core::models::{
    BlobRefs, CreateVideoRequest, CreatedVideo, DeletedVideo, TagId, UpdateVideoRequest,
    UpdatedVideo, VideoId,
};
use vidcat_core::{AppError, StoreError};
use vidcat_db::{
    reconcile_tags, resolve_blob_refs, stale_fields, CatalogStore, CatalogTransaction, LinkMode,
    TransactionScope, COVER_KEY_CONSTRAINT, VIDEO_KEY_CONSTRAINT,
};

use crate::compensation::CompensationExecutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Validating,
    InTransaction,
    Committed,
    Reconciling,
    Done,
    Aborted,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Validating => "validating",
            LifecycleState::InTransaction => "in_transaction",
            LifecycleState::Committed => "committed",
            LifecycleState::Reconciling => "reconciling",
            LifecycleState::Done => "done",
            LifecycleState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

fn transition(operation: &'static str, video_id: Option<VideoId>, state: LifecycleState) {
    tracing::debug!(
        lifecycle.operation = operation,
        video_id = ?video_id,
        state = %state,
        "Lifecycle state changed"
    );
}

/// Why an operation stopped inside its transaction.
#[derive(Debug)]
enum Abort {
    Store(StoreError),
    NotFound(VideoId),
    StaleKeys {
        video_id: VideoId,
        fields: Vec<&'static str>,
    },
}

impl From<StoreError> for Abort {
    fn from(err: StoreError) -> Self {
        Abort::Store(err)
    }
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Abort::Store(e) => write!(f, "{}", e),
            Abort::NotFound(id) => write!(f, "video {} not found", id),
            Abort::StaleKeys { video_id, fields } => {
                write!(f, "video {} has different {}", video_id, fields.join(", "))
            }
        }
    }
}

impl Abort {
    /// The blob key a unique violation collided with, if any.
    fn conflicting_key<'a>(&self, keys: &RowKeys<'a>) -> Option<&'a str> {
        let Abort::Store(err) = self else {
            return None;
        };
        match err.unique_constraint() {
            Some(constraint) if constraint == VIDEO_KEY_CONSTRAINT => Some(keys.video_key),
            Some(constraint) if constraint == COVER_KEY_CONSTRAINT => Some(keys.cover_key),
            _ => None,
        }
    }

    /// Classify for the caller. `orphan_keys` are uploaded blobs no committed
    /// row references; stale-key and not-found rejections never carry any, so
    /// the caller can retry with the same uploads.
    fn into_app_error(self, operation: &'static str, orphan_keys: Vec<String>) -> AppError {
        match self {
            Abort::Store(err) => classify_store_error(err, operation, orphan_keys),
            Abort::NotFound(id) => AppError::NotFound(format!("Video {} not found", id)),
            Abort::StaleKeys { video_id, fields } => AppError::Conflict {
                constraint: "stale_old_keys".to_string(),
                message: format!(
                    "Old keys do not match video {} (stale {})",
                    video_id,
                    fields.join(", ")
                ),
                orphan_keys: Vec::new(),
            },
        }
    }
}

/// A unique violation on a blob key means that key belongs to another
/// committed video. Only the caller's other uploads can be orphans.
fn classify_store_error(
    err: StoreError,
    operation: &'static str,
    orphan_keys: Vec<String>,
) -> AppError {
    match err.unique_constraint() {
        Some(constraint) if constraint == VIDEO_KEY_CONSTRAINT => AppError::Conflict {
            constraint: constraint.to_string(),
            message: "Video key is already used by another video".to_string(),
            orphan_keys,
        },
        Some(constraint) if constraint == COVER_KEY_CONSTRAINT => AppError::Conflict {
            constraint: constraint.to_string(),
            message: "Cover key is already used by another video".to_string(),
            orphan_keys,
        },
        _ => AppError::Transaction {
            message: format!("{} transaction failed and was rolled back", operation),
            orphan_keys,
            source: Some(err),
        },
    }
}

/// Keys the row would have held, and which of them the caller uploaded for
/// this operation.
struct RowKeys<'a> {
    cover_key: &'a str,
    video_key: &'a str,
    uploaded: Vec<String>,
}

impl<'a> RowKeys<'a> {
    fn for_create(request: &'a CreateVideoRequest) -> Self {
        Self {
            cover_key: &request.cover_key,
            video_key: &request.video_key,
            uploaded: request.uploaded_keys(),
        }
    }

    fn for_update(request: &'a UpdateVideoRequest) -> Self {
        Self {
            cover_key: request.effective_cover_key(),
            video_key: request.effective_video_key(),
            uploaded: request.replacement_keys(),
        }
    }
}

pub struct LifecycleOrchestrator<S: CatalogStore> {
    catalog: S,
    compensation: CompensationExecutor,
}

impl<S: CatalogStore> LifecycleOrchestrator<S> {
    pub fn new(catalog: S, compensation: CompensationExecutor) -> Self {
        Self {
            catalog,
            compensation,
        }
    }

    pub fn catalog(&self) -> &S {
        &self.catalog
    }

    /// Create a video whose two blobs the client already uploaded.
    ///
    /// On `Transaction` errors the uploaded keys are returned as orphans for
    /// [`Self::discard_orphans`]. On a key `Conflict` only the other uploaded
    /// key is returned, and only if no committed video references it.
    #[tracing::instrument(skip(self, request), fields(lifecycle.operation = "create"))]
    pub async fn create(&self, request: CreateVideoRequest) -> Result<CreatedVideo, AppError> {
        const OP: &str = "create";
        transition(OP, None, LifecycleState::Validating);
        request.validate()?;

        transition(OP, None, LifecycleState::InTransaction);
        let mut scope = match TransactionScope::begin(&self.catalog, OP).await {
            Ok(scope) => scope,
            Err(e) => {
                let keys = RowKeys::for_create(&request);
                return Err(self.aborted(OP, None, Abort::Store(e), Some(keys)).await);
            }
        };

        let (video_id, tag_ids) = match create_statements(scope.tx(), &request).await {
            Ok(created) => created,
            Err(e) => {
                let e = scope.abort(e).await;
                let keys = RowKeys::for_create(&request);
                return Err(self.aborted(OP, None, e, Some(keys)).await);
            }
        };

        if let Err(e) = scope.commit().await {
            let keys = RowKeys::for_create(&request);
            return Err(self.aborted(OP, Some(video_id), Abort::Store(e), Some(keys)).await);
        }
        transition(OP, Some(video_id), LifecycleState::Committed);
        tracing::info!(video_id, tag_count = tag_ids.len(), "Video created");

        // Nothing to release on create.
        transition(OP, Some(video_id), LifecycleState::Done);
        Ok(CreatedVideo { video_id, tag_ids })
    }

    /// Rewrite a video's metadata and release superseded blobs after commit.
    ///
    /// Old keys must match the stored row. Blob deletion failures after commit
    /// come back in `pending_cleanup`; the metadata change stands.
    #[tracing::instrument(skip(self, request), fields(lifecycle.operation = "update", video_id = request.video_id))]
    pub async fn update(&self, request: UpdateVideoRequest) -> Result<UpdatedVideo, AppError> {
        const OP: &str = "update";
        let video_id = request.video_id;
        transition(OP, Some(video_id), LifecycleState::Validating);
        request.validate()?;

        transition(OP, Some(video_id), LifecycleState::InTransaction);
        let mut scope = match TransactionScope::begin(&self.catalog, OP).await {
            Ok(scope) => scope,
            Err(e) => {
                let keys = RowKeys::for_update(&request);
                return Err(self.aborted(OP, Some(video_id), Abort::Store(e), Some(keys)).await);
            }
        };

        if let Err(e) = update_statements(scope.tx(), &request).await {
            let e = scope.abort(e).await;
            let keys = RowKeys::for_update(&request);
            return Err(self.aborted(OP, Some(video_id), e, Some(keys)).await);
        }

        if let Err(e) = scope.commit().await {
            let keys = RowKeys::for_update(&request);
            return Err(self.aborted(OP, Some(video_id), Abort::Store(e), Some(keys)).await);
        }
        transition(OP, Some(video_id), LifecycleState::Committed);
        tracing::info!(video_id, "Video updated");

        transition(OP, Some(video_id), LifecycleState::Reconciling);
        let report = self.compensation.execute(&request.superseded_keys()).await;
        if !report.is_complete() {
            tracing::warn!(
                video_id,
                failed_keys = ?report.failed_keys(),
                "Update committed but old blobs remain"
            );
        }

        transition(OP, Some(video_id), LifecycleState::Done);
        Ok(UpdatedVideo {
            video_id,
            cleaned_keys: report.deleted,
            pending_cleanup: report.failed,
        })
    }

    /// Delete a video row (tag links and comments cascade), then both blobs.
    #[tracing::instrument(skip(self), fields(lifecycle.operation = "delete"))]
    pub async fn delete(&self, video_id: VideoId) -> Result<DeletedVideo, AppError> {
        const OP: &str = "delete";
        transition(OP, Some(video_id), LifecycleState::Validating);
        if video_id < 1 {
            return Err(AppError::Validation(format!(
                "video_id must be positive, got {}",
                video_id
            )));
        }

        transition(OP, Some(video_id), LifecycleState::InTransaction);
        let mut scope = match TransactionScope::begin(&self.catalog, OP).await {
            Ok(scope) => scope,
            Err(e) => return Err(self.aborted(OP, Some(video_id), Abort::Store(e), None).await),
        };

        let refs = match delete_statements(scope.tx(), video_id).await {
            Ok(refs) => refs,
            Err(e) => {
                let e = scope.abort(e).await;
                return Err(self.aborted(OP, Some(video_id), e, None).await);
            }
        };

        if let Err(e) = scope.commit().await {
            return Err(self.aborted(OP, Some(video_id), Abort::Store(e), None).await);
        }
        transition(OP, Some(video_id), LifecycleState::Committed);
        tracing::info!(video_id, "Video deleted");

        transition(OP, Some(video_id), LifecycleState::Reconciling);
        let report = self.compensation.execute(&refs.keys()).await;
        if !report.is_complete() {
            tracing::warn!(
                video_id,
                failed_keys = ?report.failed_keys(),
                "Video deleted but blobs remain"
            );
        }

        transition(OP, Some(video_id), LifecycleState::Done);
        Ok(DeletedVideo {
            video_id,
            cleaned_keys: report.deleted,
            pending_cleanup: report.failed,
        })
    }

    /// Delete blobs left behind by an aborted create or update.
    ///
    /// Returns the deleted keys, or `Compensation` naming keys still present.
    #[tracing::instrument(skip(self, keys), fields(lifecycle.operation = "discard_orphans", key_count = keys.len()))]
    pub async fn discard_orphans(&self, keys: &[String]) -> Result<Vec<String>, AppError> {
        if keys.is_empty() {
            return Err(AppError::Validation(
                "At least one storage key is required".to_string(),
            ));
        }
        if keys.iter().any(|k| k.trim().is_empty()) {
            return Err(AppError::Validation(
                "Storage keys must not be empty".to_string(),
            ));
        }

        self.compensation.execute(keys).await.into_result()
    }

    async fn aborted(
        &self,
        operation: &'static str,
        video_id: Option<VideoId>,
        reason: Abort,
        keys: Option<RowKeys<'_>>,
    ) -> AppError {
        transition(operation, video_id, LifecycleState::Aborted);
        let orphan_keys = match keys {
            Some(keys) => match reason.conflicting_key(&keys) {
                Some(conflicting) => self.unreferenced(keys.uploaded, conflicting).await,
                None => keys.uploaded,
            },
            None => Vec::new(),
        };
        let err = reason.into_app_error(operation, orphan_keys);
        match &err {
            AppError::Transaction { .. } => tracing::error!(
                operation,
                video_id = ?video_id,
                error = %err.detailed_message(),
                orphan_keys = ?err.orphan_keys(),
                "Lifecycle operation aborted"
            ),
            _ => tracing::info!(
                operation,
                video_id = ?video_id,
                error = %err,
                "Lifecycle operation rejected"
            ),
        }
        err
    }

    /// Uploaded keys other than `conflicting` that no committed row references.
    ///
    /// The failed transaction is gone, so each key is checked in a short read
    /// transaction of its own. A key that cannot be checked is left out.
    async fn unreferenced(&self, uploaded: Vec<String>, conflicting: &str) -> Vec<String> {
        let mut orphans = Vec::new();
        for key in uploaded.into_iter().filter(|key| key != conflicting) {
            match self.key_in_use(&key).await {
                Ok(false) => orphans.push(key),
                Ok(true) => {}
                Err(e) => tracing::warn!(
                    error = %e,
                    storage_key = %key,
                    "Could not check whether blob key is referenced"
                ),
            }
        }
        orphans
    }

    async fn key_in_use(&self, key: &str) -> Result<bool, StoreError> {
        let mut scope = TransactionScope::begin(&self.catalog, "key_check").await?;
        match scope.tx().blob_key_in_use(key).await {
            Ok(in_use) => {
                if let Err(e) = scope.rollback().await {
                    tracing::warn!(error = %e, "Failed to close key check transaction");
                }
                Ok(in_use)
            }
            Err(e) => Err(scope.abort(e).await),
        }
    }
}

async fn create_statements<T: CatalogTransaction>(
    tx: &mut T,
    request: &CreateVideoRequest,
) -> Result<(VideoId, Vec<TagId>), Abort> {
    let video_id = tx.insert_video(&request.to_row()).await?;
    let tag_ids = reconcile_tags(tx, video_id, &request.tags, LinkMode::Append).await?;
    Ok((video_id, tag_ids))
}

async fn update_statements<T: CatalogTransaction>(
    tx: &mut T,
    request: &UpdateVideoRequest,
) -> Result<(), Abort> {
    let video_id = request.video_id;
    let current = resolve_blob_refs(tx, video_id)
        .await?
        .ok_or(Abort::NotFound(video_id))?;

    let fields = stale_fields(&current, &request.old_cover_key, &request.old_video_key);
    if !fields.is_empty() {
        return Err(Abort::StaleKeys { video_id, fields });
    }

    if !tx.update_video(&request.to_row()).await? {
        return Err(Abort::NotFound(video_id));
    }
    reconcile_tags(tx, video_id, &request.tags, LinkMode::Replace).await?;
    Ok(())
}

async fn delete_statements<T: CatalogTransaction>(
    tx: &mut T,
    video_id: VideoId,
) -> Result<BlobRefs, Abort> {
    let refs = resolve_blob_refs(tx, video_id)
        .await?
        .ok_or(Abort::NotFound(video_id))?;

    if !tx.delete_video(video_id).await? {
        return Err(Abort::NotFound(video_id));
    }
    Ok(refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vidcat_db::test_helpers::{FailPoint, MemoryCatalog};
    use vidcat_storage::test_helpers::MockStorage;
    use vidcat_storage::LocalStorage;

    struct Harness {
        catalog: MemoryCatalog,
        storage: MockStorage,
        orchestrator: LifecycleOrchestrator<MemoryCatalog>,
    }

    fn harness(files: &[&str]) -> Harness {
        let catalog = MemoryCatalog::new();
        let storage = MockStorage::with_files(files);
        let compensation = CompensationExecutor::new(Arc::new(storage.clone()), 4);
        Harness {
            orchestrator: LifecycleOrchestrator::new(catalog.clone(), compensation),
            catalog,
            storage,
        }
    }

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn create_request(tags: &[&str], cover: &str, video: &str) -> CreateVideoRequest {
        CreateVideoRequest {
            title: "T".to_string(),
            description: Some("desc".to_string()),
            tags: strings(tags),
            cover_key: cover.to_string(),
            video_key: video.to_string(),
        }
    }

    fn update_request(
        video_id: VideoId,
        new_cover: Option<&str>,
        new_video: Option<&str>,
        old_cover: &str,
        old_video: &str,
    ) -> UpdateVideoRequest {
        UpdateVideoRequest {
            video_id,
            title: "T2".to_string(),
            description: None,
            tags: strings(&["x"]),
            new_cover_key: new_cover.map(str::to_string),
            new_video_key: new_video.map(str::to_string),
            old_cover_key: old_cover.to_string(),
            old_video_key: old_video.to_string(),
        }
    }

    /// Seed videos until one with `id` exists holding the given keys.
    fn seed_at(catalog: &MemoryCatalog, id: VideoId, cover: &str, video: &str) {
        for n in 1..id {
            catalog.seed_video("filler", &format!("covers/f{}", n), &format!("videos/f{}", n));
        }
        assert_eq!(catalog.seed_video("T", cover, video), id);
    }

    #[tokio::test]
    async fn create_commits_row_and_tags() {
        let h = harness(&["c1", "v1"]);

        let created = h
            .orchestrator
            .create(create_request(&["x", "y"], "c1", "v1"))
            .await
            .unwrap();

        assert_eq!(created.tag_ids.len(), 2);
        let video = h.catalog.video(created.video_id).unwrap();
        assert_eq!(video.video_key, "v1");
        assert_eq!(h.catalog.tag_names_for(created.video_id), strings(&["x", "y"]));
        assert!(h.storage.delete_calls().is_empty());
    }

    #[tokio::test]
    async fn duplicate_video_key_is_a_conflict_with_no_new_rows() {
        let h = harness(&["c1", "v1", "c2"]);
        h.orchestrator
            .create(create_request(&["x", "y"], "c1", "v1"))
            .await
            .unwrap();

        let err = h
            .orchestrator
            .create(create_request(&["z"], "c2", "v1"))
            .await
            .unwrap_err();

        match &err {
            AppError::Conflict { constraint, .. } => assert_eq!(constraint, VIDEO_KEY_CONSTRAINT),
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(err.orphan_keys(), strings(&["c2"]).as_slice());
        assert!(!err.has_side_effects());
        assert_eq!(h.catalog.video_count(), 1);
        assert_eq!(h.catalog.tag_count(), 2);
        assert_eq!(h.catalog.video_tag_count(), 2);
        assert!(h.storage.has_file("v1"));
    }

    #[tokio::test]
    async fn duplicate_cover_key_is_a_conflict() {
        let h = harness(&[]);
        h.orchestrator
            .create(create_request(&[], "c1", "v1"))
            .await
            .unwrap();

        let err = h
            .orchestrator
            .create(create_request(&[], "c1", "v2"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Conflict { ref constraint, .. } if constraint == COVER_KEY_CONSTRAINT
        ));
    }

    #[tokio::test]
    async fn conflicting_create_lets_the_caller_discard_its_other_upload() {
        let h = harness(&["c1", "v1", "c2"]);
        h.catalog.seed_video("A", "c1", "v1");

        let err = h
            .orchestrator
            .create(create_request(&[], "c2", "v1"))
            .await
            .unwrap_err();
        let deleted = h
            .orchestrator
            .discard_orphans(err.orphan_keys())
            .await
            .unwrap();

        assert_eq!(deleted, strings(&["c2"]));
        assert!(!h.storage.has_file("c2"));
        assert!(h.storage.has_file("v1"));
        assert!(h.storage.has_file("c1"));
    }

    #[tokio::test]
    async fn conflict_never_lists_a_key_another_video_holds() {
        let h = harness(&[]);
        h.catalog.seed_video("A", "c1", "v1");

        let err = h
            .orchestrator
            .create(create_request(&[], "c1", "v1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict { .. }));
        assert!(err.orphan_keys().is_empty());
    }

    #[tokio::test]
    async fn unchecked_keys_are_left_out_of_a_conflict() {
        let h = harness(&[]);
        h.catalog.seed_video("A", "c1", "v1");
        h.catalog.fail_at(FailPoint::KeyInUse);

        let err = h
            .orchestrator
            .create(create_request(&[], "c2", "v1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict { .. }));
        assert!(err.orphan_keys().is_empty());
    }

    #[tokio::test]
    async fn traversal_key_is_rejected_before_any_transaction() {
        let h = harness(&[]);

        let err = h
            .orchestrator
            .create(create_request(&[], "covers/c1.jpg", "videos/../v1.mp4"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(h.catalog.commits(), 0);
        assert_eq!(h.catalog.rollbacks(), 0);
    }

    #[tokio::test]
    async fn key_with_dots_in_its_name_is_released_on_delete() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("covers")).unwrap();
        std::fs::create_dir_all(dir.path().join("videos")).unwrap();
        std::fs::write(dir.path().join("covers/c..1.jpg"), b"cover").unwrap();
        std::fs::write(dir.path().join("videos/v1.mp4"), b"video").unwrap();

        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let catalog = MemoryCatalog::new();
        let orchestrator = LifecycleOrchestrator::new(
            catalog.clone(),
            CompensationExecutor::new(Arc::new(storage), 2),
        );

        let created = orchestrator
            .create(create_request(&[], "covers/c..1.jpg", "videos/v1.mp4"))
            .await
            .unwrap();
        let deleted = orchestrator.delete(created.video_id).await.unwrap();

        assert!(deleted.is_cleanup_complete());
        assert!(!dir.path().join("covers/c..1.jpg").exists());
        assert!(!dir.path().join("videos/v1.mp4").exists());
    }

    #[tokio::test]
    async fn failed_create_leaves_nothing_and_reports_orphans() {
        let h = harness(&["c1", "v1"]);
        h.catalog.fail_at(FailPoint::LinkTags);

        let err = h
            .orchestrator
            .create(create_request(&["x"], "c1", "v1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Transaction { .. }));
        assert_eq!(err.orphan_keys(), strings(&["c1", "v1"]).as_slice());
        assert_eq!(h.catalog.video_count(), 0);
        assert_eq!(h.catalog.tag_count(), 0);
        assert_eq!(h.catalog.rollbacks(), 1);
        assert!(h.storage.delete_calls().is_empty());
    }

    #[tokio::test]
    async fn rollback_failure_does_not_mask_the_statement_error() {
        let h = harness(&[]);
        h.catalog.fail_at(FailPoint::UpsertTags);
        h.catalog.fail_at(FailPoint::Rollback);

        let err = h
            .orchestrator
            .create(create_request(&["x"], "c1", "v1"))
            .await
            .unwrap_err();

        assert!(err.detailed_message().contains("UpsertTags"));
        assert_eq!(h.catalog.video_count(), 0);
    }

    #[tokio::test]
    async fn commit_failure_on_create_is_a_transaction_error() {
        let h = harness(&[]);
        h.catalog.fail_at(FailPoint::Commit);

        let err = h
            .orchestrator
            .create(create_request(&["x"], "c1", "v1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Transaction { .. }));
        assert_eq!(err.orphan_keys().len(), 2);
        assert_eq!(h.catalog.video_count(), 0);
    }

    #[tokio::test]
    async fn invalid_create_never_opens_a_transaction() {
        let h = harness(&[]);
        h.catalog.fail_at(FailPoint::Begin);

        let err = h
            .orchestrator
            .create(create_request(&[], "c1", " "))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn repeated_tag_names_link_once() {
        let h = harness(&[]);

        let created = h
            .orchestrator
            .create(create_request(&["a", "a", "b"], "c1", "v1"))
            .await
            .unwrap();

        assert_eq!(created.tag_ids.len(), 2);
        assert_eq!(h.catalog.tag_count(), 2);
        assert_eq!(h.catalog.video_tag_count(), 2);
        assert_eq!(h.catalog.tag_names_for(created.video_id), strings(&["a", "b"]));
    }

    #[tokio::test]
    async fn update_deletes_only_the_replaced_video_key() {
        let h = harness(&["c1", "v1", "v2"]);
        seed_at(&h.catalog, 5, "c1", "v1");
        h.catalog.seed_tags(5, &["old"]);

        let updated = h
            .orchestrator
            .update(update_request(5, None, Some("v2"), "c1", "v1"))
            .await
            .unwrap();

        let video = h.catalog.video(5).unwrap();
        assert_eq!(video.video_key, "v2");
        assert_eq!(video.cover_key, "c1");
        assert_eq!(video.title, "T2");
        assert_eq!(h.catalog.tag_names_for(5), strings(&["x"]));
        assert_eq!(h.storage.delete_calls(), strings(&["v1"]));
        assert_eq!(updated.cleaned_keys, strings(&["v1"]));
        assert!(updated.is_cleanup_complete());
        assert!(h.storage.has_file("c1"));
    }

    #[tokio::test]
    async fn unchanged_cover_key_is_never_deleted() {
        let h = harness(&["c1", "v1"]);
        let id = h.catalog.seed_video("T", "c1", "v1");

        let updated = h
            .orchestrator
            .update(update_request(id, Some("c1"), None, "c1", "v1"))
            .await
            .unwrap();

        assert!(updated.cleaned_keys.is_empty());
        assert!(h.storage.delete_calls().is_empty());
    }

    #[tokio::test]
    async fn update_of_missing_video_is_not_found() {
        let h = harness(&["v2"]);

        let err = h
            .orchestrator
            .update(update_request(42, None, Some("v2"), "c1", "v1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(h.catalog.rollbacks(), 1);
        assert!(h.storage.delete_calls().is_empty());
    }

    #[tokio::test]
    async fn stale_old_keys_are_rejected_without_deleting() {
        let h = harness(&["c1", "v1", "v2"]);
        let id = h.catalog.seed_video("T", "c1", "v1");

        let err = h
            .orchestrator
            .update(update_request(id, None, Some("v2"), "c1", "v0"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict { .. }));
        assert_eq!(h.catalog.video(id).unwrap().video_key, "v1");
        assert!(h.storage.delete_calls().is_empty());
    }

    #[tokio::test]
    async fn failed_update_keeps_old_row_and_reports_new_keys() {
        let h = harness(&["c1", "v1", "v2"]);
        let id = h.catalog.seed_video("T", "c1", "v1");
        h.catalog.fail_at(FailPoint::Commit);

        let err = h
            .orchestrator
            .update(update_request(id, None, Some("v2"), "c1", "v1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Transaction { .. }));
        assert_eq!(err.orphan_keys(), strings(&["v2"]).as_slice());
        assert_eq!(h.catalog.video(id).unwrap().video_key, "v1");
        assert!(h.storage.delete_calls().is_empty());
        assert!(h.storage.has_file("v1"));
    }

    #[tokio::test]
    async fn update_to_a_key_owned_by_another_video_conflicts() {
        let h = harness(&["c1", "v1", "c2", "v2"]);
        let id = h.catalog.seed_video("A", "c1", "v1");
        h.catalog.seed_video("B", "c2", "v2");

        let err = h
            .orchestrator
            .update(update_request(id, None, Some("v2"), "c1", "v1"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Conflict { ref constraint, .. } if constraint == VIDEO_KEY_CONSTRAINT
        ));
        assert!(h.storage.has_file("v1"));
        assert!(h.storage.has_file("v2"));
    }

    #[tokio::test]
    async fn blob_failure_after_update_commit_is_partial_success() {
        let h = harness(&["c1", "v1", "c2", "v2"]);
        let id = h.catalog.seed_video("T", "c1", "v1");
        h.storage.fail_deletes_for("c1");

        let updated = h
            .orchestrator
            .update(update_request(id, Some("c2"), Some("v2"), "c1", "v1"))
            .await
            .unwrap();

        assert_eq!(h.catalog.video(id).unwrap().cover_key, "c2");
        assert_eq!(updated.cleaned_keys, strings(&["v1"]));
        assert_eq!(updated.pending_cleanup.len(), 1);
        assert_eq!(updated.pending_cleanup[0].key, "c1");
        assert!(!updated.is_cleanup_complete());
    }

    #[tokio::test]
    async fn delete_cascades_and_releases_both_blobs() {
        let h = harness(&["c1", "v2"]);
        seed_at(&h.catalog, 5, "c1", "v2");
        h.catalog.seed_tags(5, &["x", "y"]);
        h.catalog.seed_comment(5, "nice");
        h.catalog.seed_comment(5, "again");

        let deleted = h.orchestrator.delete(5).await.unwrap();

        assert!(h.catalog.video(5).is_none());
        assert_eq!(h.catalog.comment_count(5), 0);
        assert!(h.catalog.tag_names_for(5).is_empty());
        assert_eq!(h.catalog.tag_count(), 2);
        assert_eq!(h.storage.delete_calls(), strings(&["c1", "v2"]));
        assert_eq!(deleted.cleaned_keys, strings(&["c1", "v2"]));
    }

    #[tokio::test]
    async fn delete_of_missing_video_is_not_found() {
        let h = harness(&[]);

        let err = h.orchestrator.delete(9).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(h.storage.delete_calls().is_empty());
    }

    #[tokio::test]
    async fn failed_delete_commit_keeps_row_and_blobs() {
        let h = harness(&["c1", "v1"]);
        let id = h.catalog.seed_video("T", "c1", "v1");
        h.catalog.fail_at(FailPoint::Commit);

        let err = h.orchestrator.delete(id).await.unwrap_err();

        assert!(matches!(err, AppError::Transaction { .. }));
        assert!(err.orphan_keys().is_empty());
        assert!(h.catalog.video(id).is_some());
        assert!(h.storage.delete_calls().is_empty());
    }

    #[tokio::test]
    async fn blob_failure_after_delete_does_not_restore_the_row() {
        let h = harness(&["c1", "v1"]);
        let id = h.catalog.seed_video("T", "c1", "v1");
        h.storage.fail_deletes_for("v1");

        let deleted = h.orchestrator.delete(id).await.unwrap();

        assert!(h.catalog.video(id).is_none());
        assert_eq!(deleted.cleaned_keys, strings(&["c1"]));
        assert_eq!(deleted.pending_cleanup[0].key, "v1");
    }

    #[tokio::test]
    async fn discard_orphans_deletes_keys_from_an_aborted_create() {
        let h = harness(&["c1", "v1"]);
        h.catalog.fail_at(FailPoint::InsertVideo);

        let err = h
            .orchestrator
            .create(create_request(&[], "c1", "v1"))
            .await
            .unwrap_err();
        let deleted = h
            .orchestrator
            .discard_orphans(err.orphan_keys())
            .await
            .unwrap();

        assert_eq!(deleted, strings(&["c1", "v1"]));
        assert!(!h.storage.has_file("c1"));
        assert!(!h.storage.has_file("v1"));
    }

    #[tokio::test]
    async fn discard_orphans_validates_and_reports_failures() {
        let h = harness(&["a", "b"]);

        let err = h.orchestrator.discard_orphans(&[]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = h
            .orchestrator
            .discard_orphans(&strings(&["a", ""]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(h.storage.delete_calls().is_empty());

        h.storage.fail_deletes_for("b");
        let err = h
            .orchestrator
            .discard_orphans(&strings(&["a", "b"]))
            .await
            .unwrap_err();
        match err {
            AppError::Compensation { failed_keys } => assert_eq!(failed_keys, strings(&["b"])),
            other => panic!("expected compensation error, got {:?}", other),
        }
    }
}
