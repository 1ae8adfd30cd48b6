//! Rate limiting for authentication endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to prevent brute force
//! and signup spam.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::net::SocketAddr;
use std::{num::NonZeroU32, sync::Arc};

/// Per-IP keyed rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Rate limiting configuration for authentication endpoints.
pub struct RateLimitConfig {
    /// Per-IP limiter for registration (strict: 3 per minute)
    pub signup: Arc<IpLimiter>,
    /// Per-IP limiter for credential attempts, login and forgot-password
    /// (1 per second with a burst of 5)
    pub credentials: Arc<IpLimiter>,
}

impl RateLimitConfig {
    pub fn new() -> Self {
        Self {
            signup: Arc::new(RateLimiter::keyed(Quota::per_minute(
                NonZeroU32::new(3).unwrap(),
            ))),
            credentials: Arc::new(RateLimiter::keyed(
                Quota::per_second(NonZeroU32::new(1).unwrap())
                    .allow_burst(NonZeroU32::new(5).unwrap()),
            )),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Middleware for rate limiting registration.
pub async fn rate_limit_signup(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    check(&config.signup, request, next, "Too many signup attempts. Please wait before trying again.").await
}

/// Middleware for rate limiting credential attempts.
pub async fn rate_limit_credentials(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    check(
        &config.credentials,
        request,
        next,
        "Too many authentication attempts. Please wait before trying again.",
    )
    .await
}

async fn check(limiter: &IpLimiter, request: Request, next: Next, message: &'static str) -> Response {
    let Some(ip) = client_ip(&request) else {
        return (StatusCode::FORBIDDEN, "Unable to determine client IP.").into_response();
    };

    match limiter.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => (StatusCode::TOO_MANY_REQUESTS, message).into_response(),
    }
}

/// Extract the client IP: X-Forwarded-For first (reverse proxy), then the
/// peer address from ConnectInfo.
fn client_ip(request: &Request) -> Option<String> {
    if let Some(forwarded_for) = request.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded_for.to_str() {
            // May contain multiple IPs, the first is the original client
            if let Some(first_ip) = value.split(',').next() {
                let ip = first_ip.trim();
                if !ip.is_empty() {
                    return Some(ip.to_string());
                }
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}
