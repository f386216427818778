//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the upstream bases parse and carry a host
//! - Validate value ranges (window > 0, prefix shape)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::GatewayConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn err(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let prefix = &config.upstream.proxy_prefix;
    if !prefix.starts_with('/') || prefix.len() < 2 {
        errors.push(err(
            "upstream.proxy_prefix",
            "must start with '/' and name at least one path segment",
        ));
    }
    if prefix.ends_with('/') {
        errors.push(err("upstream.proxy_prefix", "must not end with '/'"));
    }

    for (field, base, schemes) in [
        ("upstream.http_base", &config.upstream.http_base, ["http", "https"]),
        ("upstream.ws_base", &config.upstream.ws_base, ["ws", "wss"]),
    ] {
        match url::Url::parse(base) {
            Ok(u) => {
                if !schemes.contains(&u.scheme()) {
                    errors.push(err(field, format!("scheme must be one of {:?}", schemes)));
                }
                if u.host_str().is_none() {
                    errors.push(err(field, "must include a host"));
                }
            }
            Err(e) => errors.push(err(field, format!("invalid URL: {}", e))),
        }
    }

    if config.rate_limit.enabled {
        if config.rate_limit.window_secs == 0 {
            errors.push(err("rate_limit.window_secs", "must be greater than zero"));
        }
        if config.rate_limit.max_requests == 0 {
            errors.push(err("rate_limit.max_requests", "must be greater than zero"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
