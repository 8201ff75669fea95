use serde::Serialize;
use uuid::Uuid;

use crate::{
    dto::comments::CommentResponse,
    models::comments::{CommentStatus, ModerationDecision},
};

#[derive(Debug, Serialize)]
pub struct ModerationActionLink {
    pub decision: ModerationDecision,
    pub method: &'static str,
    pub href: String,
}

#[derive(Debug, Serialize)]
pub struct ModerationQueueItem {
    pub comment: CommentResponse,
    pub resource: String,
    pub actions: Vec<ModerationActionLink>,
}

#[derive(Debug, Serialize)]
pub struct ModerationQueueResponse {
    pub data: Vec<ModerationQueueItem>,
    pub total: usize,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ModerationOutcome {
    Updated,
    NotFound,
    AlreadyDecided,
}

#[derive(Debug, Serialize)]
pub struct ModerationResultResponse {
    pub comment_id: Uuid,
    pub outcome: ModerationOutcome,
    pub status: Option<CommentStatus>,
    pub previous: Option<CommentStatus>,
    pub comment: Option<CommentResponse>,
}
