use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::models::{comments::CommentStatus, roles::Role};

#[derive(Debug, Serialize)]
#[serde(tag = "event_type")]
pub enum BusinessEvent {
    CommentSubmitted {
        comment_id: Uuid,
        resource: String,
        parent_id: Option<Uuid>,
        is_reply: bool,
    },
    CommentModerated {
        comment_id: Uuid,
        moderator_id: Uuid,
        from: CommentStatus,
        to: CommentStatus,
    },
    ModerationSkipped {
        comment_id: Uuid,
        moderator_id: Uuid,
        reason: String,
    },
    ThreadReconciled {
        resource: String,
        approved_count: usize,
        generation: u64,
    },
    ThreadReconcileFailed {
        resource: String,
        error: String,
    },
    ThreadEvicted {
        resource: String,
    },
    AccessDenied {
        user_id: Option<Uuid>,
        reason: String,
        required: Option<Role>,
    },
}

impl BusinessEvent {
    pub fn log(&self) {
        let event_json = serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self));
        info!(
            target: "business_events",
            event = %event_json,
            "Business event occurred"
        );
    }
}
