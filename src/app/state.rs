use sqlx::PgPool;
use std::sync::Arc;

use crate::{
    app::config::AppConfig,
    auth::{
        jwt::JwtConfig,
        rate_limit::{SubmitLimiter, build_submit_limiter},
    },
    realtime::{
        registry::{Threads, new_threads},
        thread::ThreadSettings,
    },
    repositories::{
        CommentStore, ProfileStore,
        comments::PgCommentStore,
        memory::{InMemoryCommentStore, InMemoryProfileStore},
        profiles::PgProfileStore,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub comments: Arc<dyn CommentStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub jwt_config: JwtConfig,
    pub threads: Threads,
    pub thread_settings: ThreadSettings,
    pub submit_limiter: SubmitLimiter,
}

impl AppState {
    pub fn new(
        comments: Arc<dyn CommentStore>,
        profiles: Arc<dyn ProfileStore>,
        config: &AppConfig,
    ) -> Self {
        Self {
            comments,
            profiles,
            jwt_config: JwtConfig::from_env(config.jwt_secret.clone()),
            threads: new_threads(),
            thread_settings: config.thread,
            submit_limiter: build_submit_limiter(config.submit_per_minute),
        }
    }

    pub fn with_pool(db: PgPool, config: &AppConfig) -> Self {
        Self::new(
            Arc::new(PgCommentStore::new(db.clone())),
            Arc::new(PgProfileStore::new(db)),
            config,
        )
    }

    pub fn in_memory(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(InMemoryCommentStore::new()),
            Arc::new(InMemoryProfileStore::new()),
            config,
        )
    }
}
