//! Per-IP rate limiting middleware.
//!
//! # Responsibilities
//! - Count proxied requests per client address over a fixed window
//! - Reject over-limit requests with a fixed warning body
//! - Attach standard `RateLimit-*` headers to every proxied response
//!
//! # Design Decisions
//! - Fixed 15-minute window by default, one counter per client IP
//! - Shared state is a `DashMap`; the only cross-request coordination is the
//!   per-entry increment
//! - Applied to proxy routes only; static assets are never counted

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;

/// Fixed body returned on rejection.
pub const RATE_LIMIT_MESSAGE: &str =
    "Too many requests from this IP, please try again later.";

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of a limiter check, carrying everything the response headers need.
#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_secs: u64,
}

/// Fixed-window request limiter keyed by client IP.
pub struct RateLimiter {
    windows: DashMap<IpAddr, Window>,
    window: Duration,
    max_requests: u32,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            window: Duration::from_secs(config.window_secs),
            max_requests: config.max_requests,
            enabled: config.enabled,
        }
    }

    /// Record one request from `client` and decide whether it may proceed.
    pub fn check(&self, client: IpAddr) -> Decision {
        if !self.enabled {
            return Decision {
                allowed: true,
                limit: self.max_requests,
                remaining: self.max_requests,
                reset_secs: self.window.as_secs(),
            };
        }

        let now = Instant::now();
        let mut entry = self.windows.entry(client).or_insert_with(|| Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        let allowed = entry.count < self.max_requests;
        if allowed {
            entry.count += 1;
        }
        let remaining = self.max_requests.saturating_sub(entry.count);
        let reset_secs = self
            .window
            .saturating_sub(now.duration_since(entry.started))
            .as_secs();

        Decision {
            allowed,
            limit: self.max_requests,
            remaining,
            reset_secs,
        }
    }
}

/// Middleware applying the limiter and stamping standard headers.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let decision = limiter.check(addr.ip());

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(client = %addr.ip(), "Rate limit exceeded");
        (StatusCode::TOO_MANY_REQUESTS, RATE_LIMIT_MESSAGE).into_response()
    };

    let headers = response.headers_mut();
    headers.insert(
        "ratelimit-limit",
        HeaderValue::from(decision.limit),
    );
    headers.insert(
        "ratelimit-remaining",
        HeaderValue::from(decision.remaining),
    );
    headers.insert(
        "ratelimit-reset",
        HeaderValue::from(decision.reset_secs),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            enabled: true,
            window_secs,
            max_requests,
        })
    }

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([127, 0, 0, last])
    }

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let limiter = limiter(3, 900);
        for i in 0..3 {
            let decision = limiter.check(ip(1));
            assert!(decision.allowed, "request {} should pass", i + 1);
        }
        let decision = limiter.check(ip(1));
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn counters_are_per_client() {
        let limiter = limiter(1, 900);
        assert!(limiter.check(ip(1)).allowed);
        assert!(!limiter.check(ip(1)).allowed);
        assert!(limiter.check(ip(2)).allowed);
    }

    #[test]
    fn window_resets_after_expiry() {
        let limiter = limiter(1, 1);
        assert!(limiter.check(ip(1)).allowed);
        assert!(!limiter.check(ip(1)).allowed);
        std::thread::sleep(Duration::from_millis(1100));
        assert!(limiter.check(ip(1)).allowed);
    }

    #[test]
    fn disabled_limiter_always_allows() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            enabled: false,
            window_secs: 900,
            max_requests: 1,
        });
        for _ in 0..10 {
            assert!(limiter.check(ip(1)).allowed);
        }
    }
}
