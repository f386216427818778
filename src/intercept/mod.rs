//! Client-side interception, expressed as explicit adapters.
//!
//! The browser original monkey-patches `fetch` and the `WebSocket`
//! constructor. Here the same rewriting lives in two factories that callers
//! invoke instead of the native constructors: [`FetchInterceptor`] for HTTP
//! and [`SocketFactory`] for WebSocket dials. Both are no-ops for targets
//! that do not point at the upstream host.

pub mod fetch;
pub mod websocket;

pub use fetch::FetchInterceptor;
pub use websocket::SocketFactory;
