//! Transparent upstream proxying.
//!
//! # Data Flow
//! ```text
//! Browser ──▶ {prefix}/**  ──▶ forward.rs  ──▶ upstream HTTP base   (credential header)
//! Browser ──▶ {prefix}/** (Upgrade) ──▶ websocket.rs ──▶ upstream WS base (credential query)
//! ```
//!
//! # Design Decisions
//! - Bodies and frames are relayed, never parsed or mutated
//! - The credential is attached exactly once, server-side, and never echoed
//!   back downstream
//! - One async task per exchange; no state shared across exchanges

pub mod forward;
pub mod rewrite;
pub mod websocket;

pub use rewrite::InterceptionRule;
pub use websocket::UPSTREAM_ERROR_CLOSE_CODE;
