use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::{app::state::AppState, auth::access::Identity, error::AppError};

/// Resolves the caller into an [`Identity`] extension. A request without a
/// token is anonymous; a request with a bad token is rejected outright.
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = resolve_identity(&state, request_token(&req)).await?;
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

/// Like [`identity_middleware`], but an expired or invalid token degrades to
/// an anonymous identity so the access decision can still be reported.
pub async fn lenient_identity_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = match resolve_identity(&state, request_token(&req)).await {
        Ok(identity) => identity,
        Err(AppError::Unauthorized(reason)) => {
            tracing::debug!(%reason, "Treating caller with unusable token as anonymous");
            Identity::Anonymous
        }
        Err(error) => return Err(error),
    };
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

async fn resolve_identity(state: &AppState, token: Option<String>) -> Result<Identity, AppError> {
    let Some(token) = token else {
        return Ok(Identity::Anonymous);
    };

    let claims = state
        .jwt_config
        .verify(&token)
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;
    let user_id = claims
        .user_id()
        .ok_or(AppError::Unauthorized("Invalid user id".to_string()))?;
    let profile = state.profiles.find_profile(user_id).await?;
    Ok(Identity::Authenticated { user_id, profile })
}

fn request_token(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|val| val.strip_prefix("Bearer "))
        .map(str::to_string)
        .or_else(|| {
            let query = req.uri().query().unwrap_or("");
            let params: std::collections::HashMap<String, String> =
                serde_urlencoded::from_str(query).unwrap_or_default();
            params.get("token").cloned()
        })
}
