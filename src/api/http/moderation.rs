use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{
    app::state::AppState,
    auth::access::{AccessGate, Identity},
    dto::moderation::{ModerationQueueResponse, ModerationResultResponse},
    error::AppError,
    models::{comments::ModerationDecision, roles::Role},
    realtime::registry,
    usecases::moderation::ModerationService,
};

pub async fn moderation_queue_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ModerationQueueResponse>, AppError> {
    let actor = AccessGate::require(&identity, Some(Role::MODERATION))?;
    let response = ModerationService::queue(state.comments.as_ref(), &actor).await?;
    Ok(Json(response))
}

pub async fn approve_comment_handle(
    state: State<AppState>,
    identity: Extension<Identity>,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<ModerationResultResponse>, AppError> {
    moderate(state, identity, comment_id, ModerationDecision::Approve).await
}

pub async fn reject_comment_handle(
    state: State<AppState>,
    identity: Extension<Identity>,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<ModerationResultResponse>, AppError> {
    moderate(state, identity, comment_id, ModerationDecision::Reject).await
}

async fn moderate(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    comment_id: Uuid,
    decision: ModerationDecision,
) -> Result<Json<ModerationResultResponse>, AppError> {
    let actor = AccessGate::require(&identity, Some(Role::MODERATION))?;
    let result =
        ModerationService::moderate(state.comments.as_ref(), &actor, comment_id, decision).await?;
    if let Some(resource) = &result.changed_resource {
        registry::notify_changed(&state.threads, resource);
    }
    Ok(Json(result.response))
}
