use uuid::Uuid;

use crate::{
    auth::access::Actor,
    dto::moderation::{
        ModerationActionLink, ModerationOutcome, ModerationQueueItem, ModerationQueueResponse,
        ModerationResultResponse,
    },
    error::AppError,
    models::{
        comments::{Comment, ModerationDecision, ResourceKey},
        roles::Role,
    },
    repositories::{CommentStore, StatusUpdate},
    telemetry::BusinessEvent,
};

pub struct ModerationService;

/// Result of a moderation action plus the resource whose public thread changed.
pub struct ModerationResult {
    pub response: ModerationResultResponse,
    pub changed_resource: Option<ResourceKey>,
}

impl ModerationService {
    /// Lists every pending comment across resources, oldest first, each with
    /// its approve and reject actions.
    pub async fn queue(
        store: &dyn CommentStore,
        actor: &Actor,
    ) -> Result<ModerationQueueResponse, AppError> {
        ensure_moderator(actor)?;
        let pending = store.list_pending().await?;
        let data: Vec<ModerationQueueItem> = pending.into_iter().map(queue_item).collect();
        Ok(ModerationQueueResponse {
            total: data.len(),
            data,
        })
    }

    /// Applies a decision to a pending comment. Missing and already decided
    /// comments come back as outcomes so the queue can drop them.
    pub async fn moderate(
        store: &dyn CommentStore,
        actor: &Actor,
        comment_id: Uuid,
        decision: ModerationDecision,
    ) -> Result<ModerationResult, AppError> {
        ensure_moderator(actor)?;

        let update = store.set_status(comment_id, decision).await?;
        let result = match update {
            StatusUpdate::Updated { comment, previous } => {
                BusinessEvent::CommentModerated {
                    comment_id,
                    moderator_id: actor.user_id(),
                    from: previous,
                    to: comment.status,
                }
                .log();
                let changed_resource = comment.status.is_public().then(|| comment.resource());
                ModerationResult {
                    response: ModerationResultResponse {
                        comment_id,
                        outcome: ModerationOutcome::Updated,
                        status: Some(comment.status),
                        previous: Some(previous),
                        comment: Some(comment.into()),
                    },
                    changed_resource,
                }
            }
            StatusUpdate::AlreadyDecided { current } => {
                BusinessEvent::ModerationSkipped {
                    comment_id,
                    moderator_id: actor.user_id(),
                    reason: format!("already {current}"),
                }
                .log();
                ModerationResult {
                    response: ModerationResultResponse {
                        comment_id,
                        outcome: ModerationOutcome::AlreadyDecided,
                        status: Some(current),
                        previous: None,
                        comment: None,
                    },
                    changed_resource: None,
                }
            }
            StatusUpdate::NotFound => {
                BusinessEvent::ModerationSkipped {
                    comment_id,
                    moderator_id: actor.user_id(),
                    reason: "not found".to_string(),
                }
                .log();
                ModerationResult {
                    response: ModerationResultResponse {
                        comment_id,
                        outcome: ModerationOutcome::NotFound,
                        status: None,
                        previous: None,
                        comment: None,
                    },
                    changed_resource: None,
                }
            }
        };

        Ok(result)
    }
}

fn ensure_moderator(actor: &Actor) -> Result<(), AppError> {
    if actor.role().satisfies(Role::MODERATION) {
        return Ok(());
    }
    Err(AppError::InsufficientRole {
        required: Role::MODERATION,
        actual: actor.role(),
    })
}

fn queue_item(comment: Comment) -> ModerationQueueItem {
    let actions = [ModerationDecision::Approve, ModerationDecision::Reject]
        .into_iter()
        .map(|decision| ModerationActionLink {
            decision,
            method: "POST",
            href: format!(
                "/api/moderation/comments/{}/{}",
                comment.id,
                decision.as_str()
            ),
        })
        .collect();
    ModerationQueueItem {
        resource: comment.resource().to_string(),
        comment: comment.into(),
        actions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::access::{AccessGate, Identity},
        models::{
            comments::{CommentDraft, CommentStatus},
            profiles::Profile,
        },
        repositories::memory::InMemoryCommentStore,
    };
    use chrono::Utc;

    fn actor(role: Role) -> Actor {
        let user_id = Uuid::from_u128(42);
        let identity = Identity::Authenticated {
            user_id,
            profile: Some(Profile {
                user_id,
                display_name: "Mod".to_string(),
                role,
                is_active: true,
                created_at: Utc::now(),
            }),
        };
        AccessGate::require(&identity, None).expect("granted")
    }

    async fn seed_pending(store: &InMemoryCommentStore, resource: &ResourceKey) -> Comment {
        store
            .create_comment(
                resource,
                CommentDraft {
                    parent_id: None,
                    name: "Reader".to_string(),
                    website: None,
                    comment: "Please approve".to_string(),
                },
            )
            .await
            .expect("create")
    }

    #[tokio::test]
    async fn queue_lists_pending_across_resources_with_actions() {
        let store = InMemoryCommentStore::new();
        let hymn = seed_pending(&store, &ResourceKey::new("hymn", "1")).await;
        let book = seed_pending(&store, &ResourceKey::new("book", "9")).await;

        let queue = ModerationService::queue(&store, &actor(Role::Moderator))
            .await
            .expect("queue");
        assert_eq!(queue.total, 2);
        assert_eq!(queue.data[0].comment.id, hymn.id);
        assert_eq!(queue.data[1].resource, "book/9");
        assert_eq!(queue.data[1].comment.id, book.id);
        assert_eq!(
            queue.data[0].actions[0].href,
            format!("/api/moderation/comments/{}/approve", hymn.id)
        );
        assert_eq!(queue.data[0].actions[1].decision, ModerationDecision::Reject);
    }

    #[tokio::test]
    async fn editor_cannot_moderate() {
        let store = InMemoryCommentStore::new();
        let pending = seed_pending(&store, &ResourceKey::new("hymn", "1")).await;

        let result = ModerationService::moderate(
            &store,
            &actor(Role::Editor),
            pending.id,
            ModerationDecision::Approve,
        )
        .await;
        assert!(matches!(
            result,
            Err(AppError::InsufficientRole {
                required: Role::Moderator,
                actual: Role::Editor
            })
        ));
        assert!(matches!(
            ModerationService::queue(&store, &actor(Role::User)).await,
            Err(AppError::InsufficientRole { .. })
        ));
    }

    #[tokio::test]
    async fn approval_reports_changed_resource() {
        let store = InMemoryCommentStore::new();
        let resource = ResourceKey::new("hymn", "1");
        let pending = seed_pending(&store, &resource).await;

        let result = ModerationService::moderate(
            &store,
            &actor(Role::Admin),
            pending.id,
            ModerationDecision::Approve,
        )
        .await
        .expect("moderate");
        assert_eq!(result.response.outcome, ModerationOutcome::Updated);
        assert_eq!(result.response.status, Some(CommentStatus::Approved));
        assert_eq!(result.response.previous, Some(CommentStatus::Pending));
        assert_eq!(result.changed_resource, Some(resource));
        assert!(store.list_pending().await.expect("pending").is_empty());
    }

    #[tokio::test]
    async fn rejection_does_not_touch_public_thread() {
        let store = InMemoryCommentStore::new();
        let pending = seed_pending(&store, &ResourceKey::new("hymn", "1")).await;

        let result = ModerationService::moderate(
            &store,
            &actor(Role::Moderator),
            pending.id,
            ModerationDecision::Reject,
        )
        .await
        .expect("moderate");
        assert_eq!(result.response.status, Some(CommentStatus::Rejected));
        assert_eq!(result.changed_resource, None);
    }

    #[tokio::test]
    async fn rejecting_an_approved_comment_is_a_no_op() {
        let store = InMemoryCommentStore::new();
        let resource = ResourceKey::new("hymn", "1");
        let pending = seed_pending(&store, &resource).await;
        let moderator = actor(Role::Moderator);

        ModerationService::moderate(&store, &moderator, pending.id, ModerationDecision::Approve)
            .await
            .expect("approve");
        let result =
            ModerationService::moderate(&store, &moderator, pending.id, ModerationDecision::Reject)
                .await
                .expect("reject");

        assert_eq!(result.response.outcome, ModerationOutcome::AlreadyDecided);
        assert_eq!(result.response.status, Some(CommentStatus::Approved));
        let public = store.list_comments(&resource, false).await.expect("list");
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].status, CommentStatus::Approved);
    }

    #[tokio::test]
    async fn unknown_comment_is_not_found_outcome() {
        let store = InMemoryCommentStore::new();
        let result = ModerationService::moderate(
            &store,
            &actor(Role::Moderator),
            Uuid::new_v4(),
            ModerationDecision::Approve,
        )
        .await
        .expect("moderate");
        assert_eq!(result.response.outcome, ModerationOutcome::NotFound);
        assert_eq!(result.response.status, None);
    }
}
