use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::comments::{Comment, CommentDraft, CommentStatus, ModerationDecision, ResourceKey},
    repositories::{CommentStore, StatusUpdate},
};

const COMMENT_COLUMNS: &str = r#"
    id,
    resource_type,
    resource_id,
    parent_id,
    name,
    website,
    comment,
    status,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct PgCommentStore {
    pool: PgPool,
}

impl PgCommentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentStore for PgCommentStore {
    async fn create_comment(
        &self,
        resource: &ResourceKey,
        draft: CommentDraft,
    ) -> AppResult<Comment> {
        // A parent on another resource blocks the insert; an unknown parent
        // does not.
        let sql = format!(
            r#"
            INSERT INTO archive.comment (
                resource_type,
                resource_id,
                parent_id,
                name,
                website,
                comment,
                status
            )
            SELECT
                $1::varchar,
                $2::varchar,
                $3::uuid,
                $4::varchar,
                $5::varchar,
                $6::varchar,
                'pending'::archive.comment_status
            WHERE NOT EXISTS (
                SELECT 1
                FROM archive.comment parent
                WHERE parent.id = $3::uuid
                AND (parent.resource_type <> $1::varchar OR parent.resource_id <> $2::varchar)
            )
            RETURNING {COMMENT_COLUMNS}
            "#
        );
        let row = crate::log_query_fetch_optional!(
            "comments.create_comment",
            sqlx::query_as::<_, Comment>(&sql)
                .bind(&resource.resource_type)
                .bind(&resource.resource_id)
                .bind(draft.parent_id)
                .bind(draft.name)
                .bind(draft.website)
                .bind(draft.comment)
                .fetch_optional(&self.pool)
        )?;

        row.ok_or_else(|| {
            AppError::ValidationError(
                "Replies must stay on the parent comment's resource".to_string(),
            )
        })
    }

    async fn list_comments(
        &self,
        resource: &ResourceKey,
        include_unapproved: bool,
    ) -> AppResult<Vec<Comment>> {
        let sql = format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM archive.comment
            WHERE resource_type = $1
            AND resource_id = $2
            AND ($3::boolean OR status = 'approved')
            ORDER BY created_at ASC, id ASC
            "#
        );
        let rows = crate::log_query_fetch_all!(
            "comments.list_comments",
            sqlx::query_as::<_, Comment>(&sql)
                .bind(&resource.resource_type)
                .bind(&resource.resource_id)
                .bind(include_unapproved)
                .fetch_all(&self.pool)
        )?;

        Ok(rows)
    }

    async fn set_status(
        &self,
        comment_id: Uuid,
        decision: ModerationDecision,
    ) -> AppResult<StatusUpdate> {
        // The `status = 'pending'` guard is `CommentStatus::apply` done
        // atomically, so concurrent moderators cannot both decide.
        let sql = format!(
            r#"
            UPDATE archive.comment
            SET status = $2, updated_at = now()
            WHERE id = $1
            AND status = 'pending'
            RETURNING {COMMENT_COLUMNS}
            "#
        );
        let updated = crate::log_query_fetch_optional!(
            "comments.set_status",
            sqlx::query_as::<_, Comment>(&sql)
                .bind(comment_id)
                .bind(decision.target())
                .fetch_optional(&self.pool)
        )?;

        if let Some(comment) = updated {
            return Ok(StatusUpdate::Updated {
                comment,
                previous: CommentStatus::Pending,
            });
        }

        let current = crate::log_query_fetch_optional!(
            "comments.find_status",
            sqlx::query_scalar::<_, CommentStatus>(
                r#"
                SELECT status
                FROM archive.comment
                WHERE id = $1
                "#,
            )
            .bind(comment_id)
            .fetch_optional(&self.pool)
        )?;

        Ok(match current {
            Some(current) => StatusUpdate::AlreadyDecided { current },
            None => StatusUpdate::NotFound,
        })
    }

    async fn list_pending(&self) -> AppResult<Vec<Comment>> {
        let sql = format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM archive.comment
            WHERE status = 'pending'
            ORDER BY created_at ASC, id ASC
            "#
        );
        let rows = crate::log_query_fetch_all!(
            "comments.list_pending",
            sqlx::query_as::<_, Comment>(&sql).fetch_all(&self.pool)
        )?;

        Ok(rows)
    }
}
