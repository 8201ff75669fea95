use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{error::AppResult, models::profiles::Profile, repositories::ProfileStore};

#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn find_profile(&self, user_id: Uuid) -> AppResult<Option<Profile>> {
        let row = crate::log_query_fetch_optional!(
            "profiles.find_profile",
            sqlx::query_as::<_, Profile>(
                r#"
                SELECT user_id, display_name, role, is_active, created_at
                FROM core.profile
                WHERE user_id = $1
                "#,
            )
            .bind(user_id)
            .fetch_optional(&self.pool)
        )?;

        Ok(row)
    }
}
