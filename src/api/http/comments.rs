use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, OptionalFromRequestParts, Path, State},
    http::{StatusCode, request::Parts},
};

use crate::{
    app::state::AppState,
    dto::comments::{
        CommentThreadResponse, CreateCommentRequest, ReplyTargetRequest, ReplyTargetResponse,
        SubmitCommentResponse,
    },
    error::AppError,
    realtime::{
        registry,
        thread::{ComposerId, ThreadController},
    },
    usecases::comments::CommentService,
};

/// Header carrying the client-generated id of the open comment composer.
pub const COMPOSER_ID_HEADER: &str = "x-composer-id";

impl<S: Send + Sync> OptionalFromRequestParts<S> for ComposerId {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let Some(value) = parts.headers.get(COMPOSER_ID_HEADER) else {
            return Ok(None);
        };
        value
            .to_str()
            .ok()
            .and_then(ComposerId::parse)
            .map(Some)
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "{COMPOSER_ID_HEADER} must be 1-64 letters, digits, '-' or '_'"
                ))
            })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ComposerId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        <ComposerId as OptionalFromRequestParts<S>>::from_request_parts(parts, state)
            .await?
            .ok_or_else(|| AppError::BadRequest(format!("{COMPOSER_ID_HEADER} header is required")))
    }
}

async fn load_thread(
    state: &AppState,
    resource_type: &str,
    resource_id: &str,
) -> Result<Arc<ThreadController>, AppError> {
    let resource = CommentService::resource_key(resource_type, resource_id)?;
    registry::get_or_load_thread(
        &state.threads,
        &state.comments,
        state.thread_settings,
        &resource,
    )
    .await
}

pub async fn list_comments_handle(
    State(state): State<AppState>,
    Path((resource_type, resource_id)): Path<(String, String)>,
    composer: Option<ComposerId>,
) -> Result<Json<CommentThreadResponse>, AppError> {
    let thread = load_thread(&state, &resource_type, &resource_id).await?;
    Ok(Json(
        CommentService::render_thread(&thread, composer.as_ref()).await,
    ))
}

pub async fn submit_comment_handle(
    State(state): State<AppState>,
    Path((resource_type, resource_id)): Path<(String, String)>,
    composer: Option<ComposerId>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<SubmitCommentResponse>), AppError> {
    let thread = load_thread(&state, &resource_type, &resource_id).await?;
    let response = CommentService::submit(&thread, req, composer.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_reply_target_handle(
    State(state): State<AppState>,
    Path((resource_type, resource_id)): Path<(String, String)>,
    composer: ComposerId,
) -> Result<Json<ReplyTargetResponse>, AppError> {
    let thread = load_thread(&state, &resource_type, &resource_id).await?;
    Ok(Json(CommentService::reply_target(&thread, &composer).await))
}

pub async fn set_reply_target_handle(
    State(state): State<AppState>,
    Path((resource_type, resource_id)): Path<(String, String)>,
    composer: ComposerId,
    Json(req): Json<ReplyTargetRequest>,
) -> Result<Json<ReplyTargetResponse>, AppError> {
    let thread = load_thread(&state, &resource_type, &resource_id).await?;
    thread
        .select_reply_target(composer.clone(), req.comment_id)
        .await;
    Ok(Json(CommentService::reply_target(&thread, &composer).await))
}
