use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Comment status mapping for archive.comment_status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "archive.comment_status", rename_all = "lowercase")]
pub enum CommentStatus {
    Pending,
    Approved,
    Rejected,
}

impl CommentStatus {
    /// Only approved comments are ever rendered to the public.
    pub fn is_public(self) -> bool {
        self == Self::Approved
    }

    /// Approved and rejected are terminal.
    pub fn is_decided(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Applies a moderation decision. Decided comments never move again,
    /// including back to pending.
    pub fn apply(self, decision: ModerationDecision) -> StatusTransition {
        if self.is_decided() {
            return StatusTransition::AlreadyDecided { current: self };
        }
        StatusTransition::Moved {
            from: self,
            to: decision.target(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two actions a moderator can take on a pending comment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModerationDecision {
    Approve,
    Reject,
}

impl ModerationDecision {
    pub fn target(self) -> CommentStatus {
        match self {
            Self::Approve => CommentStatus::Approved,
            Self::Reject => CommentStatus::Rejected,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    Moved {
        from: CommentStatus,
        to: CommentStatus,
    },
    AlreadyDecided {
        current: CommentStatus,
    },
}

/// Identifies the subject a thread hangs off, e.g. ("hymn", "112").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub resource_type: String,
    pub resource_id: String,
}

impl ResourceKey {
    pub fn new(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.resource_id)
    }
}

/// Comment model mapped to archive.comment.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Comment {
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

impl Comment {
    pub fn belongs_to(&self, resource: &ResourceKey) -> bool {
        self.resource_type == resource.resource_type && self.resource_id == resource.resource_id
    }

    pub fn resource(&self) -> ResourceKey {
        ResourceKey::new(self.resource_type.clone(), self.resource_id.clone())
    }
}

/// Validated author input, ready to be stored as a pending comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentDraft {
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub website: Option<String>,
    pub comment: String,
}

/// A comment placed in its thread. `indent` is `depth` clamped to the
/// display cap; the tree itself is never truncated.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommentNode {
    pub comment: Comment,
    pub depth: usize,
    pub indent: usize,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    /// Number of comments in this subtree, including this one.
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.replies.iter());
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::{CommentStatus, ModerationDecision, StatusTransition};

    #[test]
    fn pending_moves_to_decision_target() {
        assert_eq!(
            CommentStatus::Pending.apply(ModerationDecision::Approve),
            StatusTransition::Moved {
                from: CommentStatus::Pending,
                to: CommentStatus::Approved,
            }
        );
        assert_eq!(
            CommentStatus::Pending.apply(ModerationDecision::Reject),
            StatusTransition::Moved {
                from: CommentStatus::Pending,
                to: CommentStatus::Rejected,
            }
        );
    }

    #[test]
    fn decided_statuses_are_terminal() {
        for current in [CommentStatus::Approved, CommentStatus::Rejected] {
            for decision in [ModerationDecision::Approve, ModerationDecision::Reject] {
                assert_eq!(
                    current.apply(decision),
                    StatusTransition::AlreadyDecided { current }
                );
            }
        }
    }

    #[test]
    fn no_decision_targets_pending() {
        for decision in [ModerationDecision::Approve, ModerationDecision::Reject] {
            assert_ne!(decision.target(), CommentStatus::Pending);
        }
    }

    #[test]
    fn only_approved_is_public() {
        assert!(CommentStatus::Approved.is_public());
        assert!(!CommentStatus::Pending.is_public());
        assert!(!CommentStatus::Rejected.is_public());
    }
}
