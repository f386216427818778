//! Gateway error types.

use thiserror::Error;

/// Errors surfaced by the gateway subsystems.
///
/// Handler code maps these to HTTP responses at the edge; everything below the
/// handlers propagates with `?`. Messages never include the credential.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid upstream URL: {0}")]
    InvalidUpstreamUrl(#[from] url::ParseError),

    #[error("upstream request failed: {0}")]
    UpstreamHttp(#[from] reqwest::Error),

    #[error("upstream websocket failed: {0}")]
    UpstreamWs(#[from] tokio_tungstenite::tungstenite::Error),
}
