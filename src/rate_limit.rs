//! Rate limiting for the login and signup endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down brute
//! force and signup spam.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};

use crate::api::ApiError;
use crate::auth::client_ip;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Tunable limits, usually from the command line.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitSettings {
    /// Login attempts allowed back to back; refills at one per second
    pub login_burst: u32,
    /// Signups per minute
    pub signup_per_minute: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            login_burst: 10,
            signup_per_minute: 5,
        }
    }
}

/// Rate limiting state for the account endpoints.
pub struct RateLimitConfig {
    pub login: IpLimiter,
    pub signup: IpLimiter,
}

fn non_zero(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN)
}

impl RateLimitConfig {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            login: RateLimiter::keyed(
                Quota::per_second(NonZeroU32::MIN).allow_burst(non_zero(settings.login_burst)),
            ),
            signup: RateLimiter::keyed(Quota::per_minute(non_zero(settings.signup_per_minute))),
        }
    }
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);
    match config.login.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!(ip = %ip, "Login rate limit exceeded");
            ApiError::TooManyRequests(
                "Too many login attempts. Please wait before trying again.".into(),
            )
            .into_response()
        }
    }
}

/// Middleware for rate limiting signups.
pub async fn rate_limit_signup(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);
    match config.signup.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!(ip = %ip, "Signup rate limit exceeded");
            ApiError::TooManyRequests(
                "Too many signup attempts. Please wait before trying again.".into(),
            )
            .into_response()
        }
    }
}
