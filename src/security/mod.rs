//! Security hardening for the proxy surface.

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, RateLimiter};
