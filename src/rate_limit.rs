//! Rate limiting for login endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down password guessing.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use serde_json::json;
use std::{num::NonZeroU32, sync::Arc};

use crate::auth::extract_client_ip;

/// Default login attempts allowed per IP and minute.
pub const DEFAULT_LOGIN_ATTEMPTS_PER_MINUTE: u32 = 10;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Rate limiting configuration for login endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Per-IP limiter shared by user and admin login.
    pub login: Arc<IpLimiter>,
    /// Read the client IP from `X-Forwarded-For` instead of the socket.
    pub trust_forwarded_for: bool,
}

impl RateLimitConfig {
    /// Create a limiter allowing `login_per_minute` attempts per IP (at least one).
    pub fn new(login_per_minute: u32, trust_forwarded_for: bool) -> Self {
        let per_minute = NonZeroU32::new(login_per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            login: Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute))),
            trust_forwarded_for,
        }
    }

    /// Drop limiter state for clients whose quota has fully replenished.
    /// Returns the number of tracked clients left.
    pub fn prune(&self) -> usize {
        self.login.retain_recent();
        self.login.shrink_to_fit();
        self.login.len()
    }
}

/// Middleware for rate limiting login endpoints.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = match extract_client_ip(&request, config.trust_forwarded_for) {
        Ok(ip) => ip,
        Err(reason) => {
            tracing::warn!(reason, "Rejecting login without client IP");
            return (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "Unable to determine client IP" })),
            )
                .into_response();
        }
    };

    match config.login.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::info!(ip = %ip, "Login rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": "Too many login attempts. Please wait before trying again." })),
            )
                .into_response()
        }
    }
}
