//! Process-wide upstream credential.
//!
//! # Responsibilities
//! - Load the upstream API key once at startup
//! - Redact the key from all Debug/Display output
//! - Expose a "configured or degraded" signal to the rest of the gateway
//!
//! # Design Decisions
//! - Absence is non-fatal: the server starts and serves in degraded mode
//! - The raw value is only reachable through [`Credential::expose`], which is
//!   called at the two injection points (header, query parameter) and nowhere else

use std::fmt;

/// Environment variables checked for the upstream API key, in precedence order.
pub const CREDENTIAL_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// The server-held upstream API key.
///
/// Never transmitted downstream. `Debug` and `Display` are redacted so the
/// value cannot leak through log fields or error messages.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// Load the credential from the environment.
    ///
    /// Returns `None` when neither variable is set or both are empty, which
    /// puts the gateway into degraded mode rather than failing startup.
    pub fn from_env() -> Option<Self> {
        for var in CREDENTIAL_ENV_VARS {
            match std::env::var(var) {
                Ok(value) if !value.trim().is_empty() => {
                    tracing::info!(source = var, "Upstream credential loaded");
                    return Some(Self(value));
                }
                _ => {}
            }
        }
        None
    }

    /// Build a credential from a literal value. Used by tests and embedders.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw secret, for injection into an upstream header or query string.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}
