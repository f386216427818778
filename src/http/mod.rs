//! HTTP server subsystem.
//!
//! # Responsibilities
//! - Assemble the Axum router (proxy routes, entry point, static files)
//! - Wire middleware (tracing, timeout, rate limiting)
//! - Serve with graceful shutdown

pub mod server;

pub use server::{AppState, GatewayServer};
