use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        comments::{
            Comment, CommentDraft, CommentStatus, ModerationDecision, ResourceKey,
            StatusTransition,
        },
        profiles::Profile,
    },
    repositories::{CommentStore, ProfileStore, StatusUpdate},
};

/// Process-local comment store. Insertion order is creation order.
#[derive(Default)]
pub struct InMemoryCommentStore {
    comments: RwLock<Vec<Comment>>,
    fail_reads: AtomicBool,
}

impl InMemoryCommentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds records as-is, bypassing the pending-on-create rule.
    pub async fn insert_raw(&self, comment: Comment) {
        self.comments.write().await.push(comment);
    }

    /// Makes every subsequent list call fail until switched back.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> AppResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Store("in-memory store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CommentStore for InMemoryCommentStore {
    async fn create_comment(
        &self,
        resource: &ResourceKey,
        draft: CommentDraft,
    ) -> AppResult<Comment> {
        let mut comments = self.comments.write().await;
        if let Some(parent_id) = draft.parent_id {
            let foreign_parent = comments
                .iter()
                .any(|comment| comment.id == parent_id && !comment.belongs_to(resource));
            if foreign_parent {
                return Err(AppError::ValidationError(
                    "Replies must stay on the parent comment's resource".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let comment = Comment {
            id: Uuid::now_v7(),
            resource_type: resource.resource_type.clone(),
            resource_id: resource.resource_id.clone(),
            parent_id: draft.parent_id,
            name: draft.name,
            website: draft.website,
            comment: draft.comment,
            status: CommentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(
        &self,
        resource: &ResourceKey,
        include_unapproved: bool,
    ) -> AppResult<Vec<Comment>> {
        self.check_reads()?;
        let comments = self.comments.read().await;
        let mut rows: Vec<Comment> = comments
            .iter()
            .filter(|comment| comment.belongs_to(resource))
            .filter(|comment| include_unapproved || comment.status.is_public())
            .cloned()
            .collect();
        rows.sort_by_key(|comment| comment.created_at);
        Ok(rows)
    }

    async fn set_status(
        &self,
        comment_id: Uuid,
        decision: ModerationDecision,
    ) -> AppResult<StatusUpdate> {
        let mut comments = self.comments.write().await;
        let Some(comment) = comments.iter_mut().find(|comment| comment.id == comment_id) else {
            return Ok(StatusUpdate::NotFound);
        };

        match comment.status.apply(decision) {
            StatusTransition::AlreadyDecided { current } => {
                Ok(StatusUpdate::AlreadyDecided { current })
            }
            StatusTransition::Moved { from, to } => {
                comment.status = to;
                comment.updated_at = Utc::now();
                Ok(StatusUpdate::Updated {
                    comment: comment.clone(),
                    previous: from,
                })
            }
        }
    }

    async fn list_pending(&self) -> AppResult<Vec<Comment>> {
        self.check_reads()?;
        let comments = self.comments.read().await;
        let mut rows: Vec<Comment> = comments
            .iter()
            .filter(|comment| comment.status == CommentStatus::Pending)
            .cloned()
            .collect();
        rows.sort_by_key(|comment| comment.created_at);
        Ok(rows)
    }
}

#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: DashMap<Uuid, Profile>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, profile: Profile) {
        self.profiles.insert(profile.user_id, profile);
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn find_profile(&self, user_id: Uuid) -> AppResult<Option<Profile>> {
        Ok(self.profiles.get(&user_id).map(|entry| entry.value().clone()))
    }
}
