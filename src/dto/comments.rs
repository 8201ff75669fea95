use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::comments::{Comment, CommentNode, CommentStatus};

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub name: String,
    pub website: Option<String>,
    pub comment: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CommentResponse {
    pub id: Uuid,
    pub resource_type: String,
    pub resource_id: String,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub website: Option<String>,
    pub comment: String,
    pub status: CommentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            resource_type: comment.resource_type,
            resource_id: comment.resource_id,
            parent_id: comment.parent_id,
            name: comment.name,
            website: comment.website,
            comment: comment.comment,
            status: comment.status,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentNodeResponse {
    #[serde(flatten)]
    pub comment: CommentResponse,
    pub depth: usize,
    pub indent: usize,
    pub replies: Vec<CommentNodeResponse>,
}

impl From<CommentNode> for CommentNodeResponse {
    fn from(node: CommentNode) -> Self {
        Self {
            comment: node.comment.into(),
            depth: node.depth,
            indent: node.indent,
            replies: node.replies.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentThreadResponse {
    pub resource_type: String,
    pub resource_id: String,
    pub data: Vec<CommentNodeResponse>,
    pub total: usize,
    pub generation: u64,
    pub warning: Option<String>,
    pub reconciled_at: Option<DateTime<Utc>>,
    pub reply_target: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SubmitCommentResponse {
    pub comment: CommentResponse,
    pub message: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ReplyTargetRequest {
    pub comment_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ReplyTargetResponse {
    pub resource_type: String,
    pub resource_id: String,
    pub comment_id: Option<Uuid>,
}
