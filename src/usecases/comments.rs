use crate::{
    dto::comments::{
        CommentThreadResponse, CreateCommentRequest, ReplyTargetResponse,
        SubmitCommentResponse,
    },
    error::AppError,
    models::comments::{CommentDraft, ResourceKey},
    realtime::thread::{ComposerId, ThreadController},
};

pub struct CommentService;

const MIN_COMMENT_LENGTH: usize = 1;
const MAX_COMMENT_LENGTH: usize = 5000;
const MAX_NAME_LENGTH: usize = 100;
const MAX_WEBSITE_LENGTH: usize = 200;
const MAX_RESOURCE_TYPE_LENGTH: usize = 32;
const MAX_RESOURCE_ID_LENGTH: usize = 128;

impl CommentService {
    /// Validates the path segments naming a resource.
    pub fn resource_key(resource_type: &str, resource_id: &str) -> Result<ResourceKey, AppError> {
        let resource_type = resource_type.trim();
        let resource_id = resource_id.trim();
        if !is_valid_resource_type(resource_type) {
            return Err(AppError::ValidationError(format!(
                "Resource type must be 1-{MAX_RESOURCE_TYPE_LENGTH} lowercase letters, digits, or hyphens"
            )));
        }
        if !is_valid_resource_id(resource_id) {
            return Err(AppError::ValidationError(format!(
                "Resource id must be 1-{MAX_RESOURCE_ID_LENGTH} visible characters"
            )));
        }
        Ok(ResourceKey::new(resource_type, resource_id))
    }

    pub fn prepare_draft(req: CreateCommentRequest) -> Result<CommentDraft, AppError> {
        Ok(CommentDraft {
            parent_id: req.parent_id,
            name: normalize_name(&req.name)?,
            website: normalize_website(req.website.as_deref())?,
            comment: normalize_comment_content(&req.comment)?,
        })
    }

    /// Validates and submits a comment to the thread. The result is pending
    /// and stays out of the rendered thread until approved.
    pub async fn submit(
        thread: &ThreadController,
        req: CreateCommentRequest,
        composer: Option<&ComposerId>,
    ) -> Result<SubmitCommentResponse, AppError> {
        let draft = Self::prepare_draft(req)?;
        let comment = thread.submit(draft, composer).await?;
        Ok(SubmitCommentResponse {
            comment: comment.into(),
            message: "Comment received and awaiting moderation".to_string(),
        })
    }

    /// Renders the public thread. `reply_target` is the requesting
    /// composer's, if it sent one.
    pub async fn render_thread(
        thread: &ThreadController,
        composer: Option<&ComposerId>,
    ) -> CommentThreadResponse {
        let render = thread.render().await;
        let resource = thread.resource();
        CommentThreadResponse {
            resource_type: resource.resource_type.clone(),
            resource_id: resource.resource_id.clone(),
            total: render.total,
            data: render.forest.into_iter().map(Into::into).collect(),
            generation: render.generation,
            warning: render.warning,
            reconciled_at: render.reconciled_at,
            reply_target: match composer {
                Some(composer) => thread.reply_target(composer).await,
                None => None,
            },
        }
    }

    pub async fn reply_target(
        thread: &ThreadController,
        composer: &ComposerId,
    ) -> ReplyTargetResponse {
        let resource = thread.resource();
        ReplyTargetResponse {
            resource_type: resource.resource_type.clone(),
            resource_id: resource.resource_id.clone(),
            comment_id: thread.reply_target(composer).await,
        }
    }
}

fn is_valid_resource_type(value: &str) -> bool {
    let len = value.chars().count();
    if !(1..=MAX_RESOURCE_TYPE_LENGTH).contains(&len) {
        return false;
    }
    value
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
}

fn is_valid_resource_id(value: &str) -> bool {
    let len = value.chars().count();
    if !(1..=MAX_RESOURCE_ID_LENGTH).contains(&len) {
        return false;
    }
    value
        .chars()
        .all(|ch| !ch.is_control() && !ch.is_whitespace() && ch != '/')
}

fn normalize_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError("Name is required".to_string()));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::ValidationError(format!(
            "Name exceeds {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_website(website: Option<&str>) -> Result<Option<String>, AppError> {
    let Some(website) = website.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    if website.chars().count() > MAX_WEBSITE_LENGTH {
        return Err(AppError::ValidationError(format!(
            "Website exceeds {MAX_WEBSITE_LENGTH} characters"
        )));
    }
    let lower = website.to_ascii_lowercase();
    let host = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"));
    match host {
        Some(rest) if !rest.is_empty() && !website.contains(char::is_whitespace) => {
            Ok(Some(website.to_string()))
        }
        _ => Err(AppError::ValidationError(
            "Website must be an http:// or https:// address".to_string(),
        )),
    }
}

fn normalize_comment_content(content: &str) -> Result<String, AppError> {
    let trimmed = content.trim();
    let len = trimmed.chars().count();
    if len < MIN_COMMENT_LENGTH {
        return Err(AppError::ValidationError(
            "Comment content is required".to_string(),
        ));
    }
    if len > MAX_COMMENT_LENGTH {
        return Err(AppError::ValidationError(format!(
            "Comment content exceeds {MAX_COMMENT_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}
