use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tokio::task::JoinHandle;

use crate::{app::state::AppState, error::AppError};

pub type SubmitLimiter = Arc<DefaultKeyedRateLimiter<IpAddr>>;

pub fn build_submit_limiter(per_minute: u32) -> SubmitLimiter {
    let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute)))
}

/// Forgets addresses whose quota has fully replenished. Returns how many
/// entries were dropped.
pub fn prune_submit_limiter(limiter: &DefaultKeyedRateLimiter<IpAddr>) -> usize {
    let before = limiter.len();
    limiter.retain_recent();
    limiter.shrink_to_fit();
    before.saturating_sub(limiter.len())
}

pub fn spawn_limiter_cleanup(limiter: SubmitLimiter, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        loop {
            tick.tick().await;
            let pruned = prune_submit_limiter(&limiter);
            if pruned > 0 {
                tracing::debug!(pruned, "Pruned idle submission rate limit entries");
            }
        }
    })
}

/// Limits public comment submissions per client address.
pub async fn submit_rate_limit_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = addr.ip();
    if state.submit_limiter.check_key(&ip).is_err() {
        tracing::warn!(%ip, "Comment submission rate limited");
        return Err(AppError::RateLimited(
            "Too many comments, please wait a minute".to_string(),
        ));
    }

    Ok(next.run(req).await)
}
