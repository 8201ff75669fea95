//! Store collaborators consumed by the comment core.
//!
//! The core never talks to Postgres directly: usecases and thread controllers
//! hold an `Arc<dyn CommentStore>` / `Arc<dyn ProfileStore>` so the same code
//! runs against [`comments::PgCommentStore`] in production and
//! [`memory::InMemoryCommentStore`] in tests and local development.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        comments::{Comment, CommentDraft, CommentStatus, ModerationDecision, ResourceKey},
        profiles::Profile,
    },
};

pub mod comments;
pub mod memory;
pub mod profiles;

/// Result of a status update. Not-found and already-decided are outcomes,
/// not errors, so a moderation queue can drop stale entries.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    Updated {
        comment: Comment,
        previous: CommentStatus,
    },
    NotFound,
    AlreadyDecided {
        current: CommentStatus,
    },
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Creates a comment for the resource. The stored status is always pending.
    async fn create_comment(&self, resource: &ResourceKey, draft: CommentDraft)
    -> AppResult<Comment>;

    /// Lists a resource's comments by ascending `created_at`. Without
    /// `include_unapproved` only approved comments are returned.
    async fn list_comments(
        &self,
        resource: &ResourceKey,
        include_unapproved: bool,
    ) -> AppResult<Vec<Comment>>;

    /// Moves a pending comment to the decision's target status and stamps
    /// `updated_at`. Decided comments are left untouched.
    async fn set_status(
        &self,
        comment_id: Uuid,
        decision: ModerationDecision,
    ) -> AppResult<StatusUpdate>;

    /// Every pending comment across all resources, oldest first.
    async fn list_pending(&self) -> AppResult<Vec<Comment>>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_profile(&self, user_id: Uuid) -> AppResult<Option<Profile>>;
}
