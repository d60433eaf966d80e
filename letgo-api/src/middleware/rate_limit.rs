use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use tracing::warn;

use letgo_core::RepoError;
use letgo_store::RedisClient;

use crate::error::AppError;
use crate::state::AppState;

/// Counts requests per client key; `Ok(false)` means the key is over its budget.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn allow(&self, key: &str) -> Result<bool, RepoError>;
}

pub struct RedisRateLimiter {
    redis: RedisClient,
    limit: i64,
    window_seconds: i64,
}

impl RedisRateLimiter {
    pub fn new(redis: RedisClient, limit: i64, window_seconds: i64) -> Self {
        Self { redis, limit, window_seconds }
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn allow(&self, key: &str) -> Result<bool, RepoError> {
        Ok(self.redis.check_rate_limit(key, self.limit, self.window_seconds).await?)
    }
}

/// Per-IP limiter. Passes everything through when no limiter is configured, the peer
/// address is unknown, or the backing store is unreachable.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (Some(limiter), Some(ConnectInfo(addr))) = (
        state.rate_limiter.as_ref(),
        req.extensions().get::<ConnectInfo<SocketAddr>>().copied(),
    ) else {
        return Ok(next.run(req).await);
    };

    let key = format!("ratelimit:{}", addr.ip());
    match limiter.allow(&key).await {
        Ok(true) => Ok(next.run(req).await),
        Ok(false) => Err(AppError::RateLimited {
            message: "Rate limit exceeded".to_string(),
            retry_after: None,
        }),
        Err(e) => {
            // Fail open
            warn!("Rate limiter unavailable: {}", e);
            Ok(next.run(req).await)
        }
    }
}
