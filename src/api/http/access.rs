use axum::{
    Extension, Json,
    extract::Query,
};

use crate::{
    auth::access::{AccessDecision, AccessGate, Identity},
    dto::access::AccessQuery,
    error::AppError,
    models::roles::Role,
};

/// Reports what the gate would decide for the caller, so a client can pick
/// between loading, sign-in, profile setup, deactivated and denied views.
pub async fn access_decision_handle(
    Extension(identity): Extension<Identity>,
    Query(query): Query<AccessQuery>,
) -> Result<Json<AccessDecision>, AppError> {
    let required = match query.required.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(value) => Some(
            Role::parse(value)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown role: {value}")))?,
        ),
    };
    Ok(Json(AccessGate::evaluate(&identity, required)))
}

pub async fn health_handle() -> &'static str {
    "ok"
}
