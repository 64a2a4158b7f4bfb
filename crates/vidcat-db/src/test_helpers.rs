//! In-memory catalog for unit tests
//!
//! Each transaction works on a private copy of the committed state, which
//! replaces the shared state on commit. Unique constraints and the cascade
//! from videos to tag links and comments behave like the PostgreSQL schema.
//! Fail points make any statement, the commit or the rollback return an error.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};
use vidcat_core::models::{
    BlobRefs, Comment, CommentId, NewVideoRow, Tag, TagId, Video, VideoId, VideoRowUpdate,
};
use vidcat_core::StoreError;

use crate::db::catalog::{
    CatalogStore, CatalogTransaction, COVER_KEY_CONSTRAINT, VIDEO_KEY_CONSTRAINT,
};

/// Step at which an injected failure fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Begin,
    InsertVideo,
    UpdateVideo,
    DeleteVideo,
    SelectBlobRefs,
    KeyInUse,
    UpsertTags,
    ClearTags,
    LinkTags,
    Commit,
    Rollback,
}

#[derive(Debug, Clone, Default)]
struct CatalogState {
    videos: BTreeMap<VideoId, Video>,
    tags: BTreeMap<String, TagId>,
    video_tags: BTreeSet<(VideoId, TagId)>,
    comments: Vec<Comment>,
    next_video_id: VideoId,
    next_tag_id: TagId,
    next_comment_id: CommentId,
}

impl CatalogState {
    fn check_keys(
        &self,
        cover_key: &str,
        video_key: &str,
        except: Option<VideoId>,
    ) -> Result<(), StoreError> {
        let others = || self.videos.values().filter(move |v| Some(v.id) != except);
        if others().any(|v| v.cover_key == cover_key) {
            return Err(StoreError::UniqueViolation {
                constraint: COVER_KEY_CONSTRAINT.to_string(),
            });
        }
        if others().any(|v| v.video_key == video_key) {
            return Err(StoreError::UniqueViolation {
                constraint: VIDEO_KEY_CONSTRAINT.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
struct Shared {
    state: CatalogState,
    fail_points: HashSet<FailPoint>,
    commits: usize,
    rollbacks: usize,
}

/// Catalog store that keeps everything in memory.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call of `point` fail until cleared.
    pub fn fail_at(&self, point: FailPoint) {
        self.shared.lock().unwrap().fail_points.insert(point);
    }

    pub fn clear_fail_points(&self) {
        self.shared.lock().unwrap().fail_points.clear();
    }

    /// Insert and commit a video directly, bypassing fail points.
    pub fn seed_video(&self, title: &str, cover_key: &str, video_key: &str) -> VideoId {
        let mut shared = self.shared.lock().unwrap();
        let state = &mut shared.state;
        state.next_video_id += 1;
        let id = state.next_video_id;
        state.videos.insert(
            id,
            Video {
                id,
                title: title.to_string(),
                description: None,
                cover_key: cover_key.to_string(),
                video_key: video_key.to_string(),
                upload_date: Utc::now(),
                views_count: 0,
            },
        );
        id
    }

    /// Link committed tags to a committed video, creating tags as needed.
    pub fn seed_tags(&self, video_id: VideoId, names: &[&str]) {
        let mut shared = self.shared.lock().unwrap();
        let state = &mut shared.state;
        for name in names {
            let tag_id = match state.tags.get(*name) {
                Some(id) => *id,
                None => {
                    state.next_tag_id += 1;
                    state.tags.insert(name.to_string(), state.next_tag_id);
                    state.next_tag_id
                }
            };
            state.video_tags.insert((video_id, tag_id));
        }
    }

    /// Add a committed comment to a video.
    pub fn seed_comment(&self, video_id: VideoId, content: &str) -> CommentId {
        let mut shared = self.shared.lock().unwrap();
        let state = &mut shared.state;
        state.next_comment_id += 1;
        let comment_id = state.next_comment_id;
        state.comments.push(Comment {
            comment_id,
            video_id,
            content: content.to_string(),
            created_at: Utc::now(),
        });
        comment_id
    }

    pub fn video(&self, video_id: VideoId) -> Option<Video> {
        self.shared.lock().unwrap().state.videos.get(&video_id).cloned()
    }

    pub fn video_count(&self) -> usize {
        self.shared.lock().unwrap().state.videos.len()
    }

    pub fn tag_count(&self) -> usize {
        self.shared.lock().unwrap().state.tags.len()
    }

    pub fn video_tag_count(&self) -> usize {
        self.shared.lock().unwrap().state.video_tags.len()
    }

    pub fn comment_count(&self, video_id: VideoId) -> usize {
        self.shared
            .lock()
            .unwrap()
            .state
            .comments
            .iter()
            .filter(|c| c.video_id == video_id)
            .count()
    }

    /// Committed tag names linked to a video, sorted.
    pub fn tag_names_for(&self, video_id: VideoId) -> Vec<String> {
        let shared = self.shared.lock().unwrap();
        let state = &shared.state;
        let mut names: Vec<String> = state
            .tags
            .iter()
            .filter(|(_, id)| state.video_tags.contains(&(video_id, **id)))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn commits(&self) -> usize {
        self.shared.lock().unwrap().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.shared.lock().unwrap().rollbacks
    }
}

fn injected(point: FailPoint) -> StoreError {
    StoreError::Backend(format!("injected failure at {:?}", point))
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, StoreError> {
        let shared = self.shared.lock().unwrap();
        if shared.fail_points.contains(&FailPoint::Begin) {
            return Err(injected(FailPoint::Begin));
        }
        Ok(MemoryTransaction {
            staged: shared.state.clone(),
            shared: Arc::clone(&self.shared),
        })
    }
}

/// Transaction over a staged copy of the catalog.
pub struct MemoryTransaction {
    staged: CatalogState,
    shared: Arc<Mutex<Shared>>,
}

impl MemoryTransaction {
    fn check(&self, point: FailPoint) -> Result<(), StoreError> {
        if self.shared.lock().unwrap().fail_points.contains(&point) {
            return Err(injected(point));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogTransaction for MemoryTransaction {
    async fn insert_video(&mut self, row: &NewVideoRow) -> Result<VideoId, StoreError> {
        self.check(FailPoint::InsertVideo)?;
        self.staged
            .check_keys(&row.cover_key, &row.video_key, None)?;

        self.staged.next_video_id += 1;
        let id = self.staged.next_video_id;
        self.staged.videos.insert(
            id,
            Video {
                id,
                title: row.title.clone(),
                description: row.description.clone(),
                cover_key: row.cover_key.clone(),
                video_key: row.video_key.clone(),
                upload_date: Utc::now(),
                views_count: 0,
            },
        );
        Ok(id)
    }

    async fn update_video(&mut self, row: &VideoRowUpdate) -> Result<bool, StoreError> {
        self.check(FailPoint::UpdateVideo)?;
        if !self.staged.videos.contains_key(&row.id) {
            return Ok(false);
        }
        self.staged
            .check_keys(&row.cover_key, &row.video_key, Some(row.id))?;

        if let Some(video) = self.staged.videos.get_mut(&row.id) {
            video.title = row.title.clone();
            video.description = row.description.clone();
            video.cover_key = row.cover_key.clone();
            video.video_key = row.video_key.clone();
            video.upload_date = Utc::now();
        }
        Ok(true)
    }

    async fn delete_video(&mut self, video_id: VideoId) -> Result<bool, StoreError> {
        self.check(FailPoint::DeleteVideo)?;
        if self.staged.videos.remove(&video_id).is_none() {
            return Ok(false);
        }
        self.staged.video_tags.retain(|(vid, _)| *vid != video_id);
        self.staged.comments.retain(|c| c.video_id != video_id);
        Ok(true)
    }

    async fn select_blob_refs(
        &mut self,
        video_id: VideoId,
    ) -> Result<Option<BlobRefs>, StoreError> {
        self.check(FailPoint::SelectBlobRefs)?;
        Ok(self.staged.videos.get(&video_id).map(|video| BlobRefs {
            cover_key: video.cover_key.clone(),
            video_key: video.video_key.clone(),
        }))
    }

    async fn blob_key_in_use(&mut self, key: &str) -> Result<bool, StoreError> {
        self.check(FailPoint::KeyInUse)?;
        Ok(self
            .staged
            .videos
            .values()
            .any(|v| v.cover_key == key || v.video_key == key))
    }

    async fn upsert_tags(&mut self, names: &[String]) -> Result<Vec<Tag>, StoreError> {
        self.check(FailPoint::UpsertTags)?;
        let mut tags = Vec::with_capacity(names.len());
        for name in names {
            let tag_id = match self.staged.tags.get(name) {
                Some(id) => *id,
                None => {
                    self.staged.next_tag_id += 1;
                    let id = self.staged.next_tag_id;
                    self.staged.tags.insert(name.clone(), id);
                    id
                }
            };
            tags.push(Tag {
                tag_id,
                tag_name: name.clone(),
            });
        }
        // Row order from the database is unspecified; do not hand back input order.
        tags.reverse();
        Ok(tags)
    }

    async fn clear_video_tags(&mut self, video_id: VideoId) -> Result<u64, StoreError> {
        self.check(FailPoint::ClearTags)?;
        let before = self.staged.video_tags.len();
        self.staged.video_tags.retain(|(vid, _)| *vid != video_id);
        Ok((before - self.staged.video_tags.len()) as u64)
    }

    async fn link_video_tags(
        &mut self,
        video_id: VideoId,
        tag_ids: &[TagId],
    ) -> Result<u64, StoreError> {
        self.check(FailPoint::LinkTags)?;
        if !self.staged.videos.contains_key(&video_id) {
            return Err(StoreError::Backend(format!(
                "video_tags references missing video {}",
                video_id
            )));
        }
        let inserted = tag_ids
            .iter()
            .filter(|tag_id| self.staged.video_tags.insert((video_id, **tag_id)))
            .count();
        Ok(inserted as u64)
    }

    async fn commit(self) -> Result<(), StoreError> {
        let mut shared = self.shared.lock().unwrap();
        if shared.fail_points.contains(&FailPoint::Commit) {
            return Err(injected(FailPoint::Commit));
        }
        shared.state = self.staged;
        shared.commits += 1;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        let mut shared = self.shared.lock().unwrap();
        if shared.fail_points.contains(&FailPoint::Rollback) {
            return Err(injected(FailPoint::Rollback));
        }
        shared.rollbacks += 1;
        Ok(())
    }
}
