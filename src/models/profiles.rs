use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::models::roles::Role;

/// Profile model mapped to core.profile. A signed-in identity may not have
/// one yet when the store lags behind the identity provider.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub user_id: Uuid,
    pub display_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
