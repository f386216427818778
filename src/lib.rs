//! Transparent upstream gateway library.
//!
//! Exposes a generative-language upstream API under a same-origin path prefix,
//! injecting a server-held credential that is never revealed downstream, and
//! ships the client-side rewriting logic as explicit, testable adapters.

pub mod config;
pub mod credential;
pub mod error;
pub mod http;
pub mod intercept;
pub mod proxy;
pub mod security;
pub mod site;

pub use config::GatewayConfig;
pub use credential::Credential;
pub use error::GatewayError;
pub use http::GatewayServer;
pub use proxy::InterceptionRule;
