use std::{net::SocketAddr, time::Duration};

use crate::{error::AppError, realtime::thread::ThreadSettings, usecases::comment_tree};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_JWT_SECRET: &str = "dev-only-comment-secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub cors_origin: String,
    pub jwt_secret: String,
    pub store: StoreBackend,
    pub database: Option<DatabaseConfig>,
    pub thread: ThreadSettings,
    pub snapshot_refresh: Duration,
    pub thread_idle: Duration,
    pub submit_per_minute: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let store = match read_env_string("COMMENT_STORE").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(AppError::Internal(format!(
                    "COMMENT_STORE must be postgres or memory, got {}",
                    other
                )));
            }
        };

        let database = match store {
            StoreBackend::Memory => None,
            StoreBackend::Postgres => {
                let url = std::env::var("DATABASE_URL")
                    .map_err(|err| AppError::Internal(format!("DATABASE_URL missing: {}", err)))?;
                Some(DatabaseConfig {
                    url,
                    max_connections: read_env_u32("DATABASE_MAX_CONNECTIONS").unwrap_or(20),
                    min_connections: read_env_u32("DATABASE_MIN_CONNECTIONS").unwrap_or(5),
                    acquire_timeout: Duration::from_secs(
                        read_env_u64("DATABASE_ACQUIRE_TIMEOUT_SECS").unwrap_or(15),
                    ),
                })
            }
        };

        let bind_addr = read_env_string("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|err| AppError::Internal(format!("BIND_ADDR invalid: {}", err)))?;

        let jwt_secret = match read_env_string("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set, using development secret");
                DEFAULT_JWT_SECRET.to_string()
            }
        };

        let defaults = ThreadSettings::default();
        let thread = ThreadSettings {
            reconcile_delay: read_env_u64("COMMENT_RECONCILE_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconcile_delay),
            depth_cap: read_env_u32("COMMENT_DISPLAY_DEPTH_CAP")
                .map(|cap| cap as usize)
                .filter(|cap| *cap > 0)
                .unwrap_or(comment_tree::DEFAULT_DEPTH_CAP),
        };

        Ok(Self {
            bind_addr,
            cors_origin: read_env_string("CORS_ORIGIN")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            jwt_secret,
            store,
            database,
            thread,
            snapshot_refresh: Duration::from_secs(
                read_env_u64("COMMENT_SNAPSHOT_REFRESH_SECS")
                    .filter(|secs| *secs > 0)
                    .unwrap_or(60),
            ),
            thread_idle: Duration::from_secs(
                read_env_u64("COMMENT_THREAD_IDLE_SECS")
                    .filter(|secs| *secs > 0)
                    .unwrap_or(300),
            ),
            submit_per_minute: read_env_u32("COMMENT_SUBMIT_PER_MINUTE").unwrap_or(10),
        })
    }
}

fn read_env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_env_u32(key: &str) -> Option<u32> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
}

fn read_env_u64(key: &str) -> Option<u64> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
}
