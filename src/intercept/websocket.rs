//! WebSocket dial interception.
//!
//! The browser original wraps the global `WebSocket` constructor; here the
//! wrapper is an explicit factory. [`SocketFactory::rewrite_target`] is the
//! testable URL → URL function, and [`SocketFactory::connect`] dials the
//! rewritten target with the requested subprotocols.

use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, client::IntoClientRequest},
    MaybeTlsStream, WebSocketStream,
};
use url::Url;

use crate::error::GatewayError;
use crate::proxy::rewrite::InterceptionRule;

/// Handshake response returned alongside a connected socket.
pub type HandshakeResponse = tungstenite::handshake::client::Response;

/// Factory that callers invoke instead of dialing the upstream directly.
pub struct SocketFactory {
    rule: InterceptionRule,
}

impl SocketFactory {
    pub fn new(rule: InterceptionRule) -> Self {
        Self { rule }
    }

    /// Rewrite a dial target when it points at the upstream host.
    ///
    /// Malformed or non-matching input comes back unchanged, so callers can
    /// pass anything they would have handed to the native constructor.
    pub fn rewrite_target(&self, raw: &str) -> String {
        match Url::parse(raw) {
            Ok(url) => self
                .rule
                .rewrite_ws(&url)
                .map(|rewritten| rewritten.to_string())
                .unwrap_or_else(|| raw.to_string()),
            Err(_) => raw.to_string(),
        }
    }

    /// Dial `raw`, diverted through the gateway when it targets the upstream.
    pub async fn connect(
        &self,
        raw: &str,
        subprotocols: &[&str],
    ) -> Result<(WebSocketStream<MaybeTlsStream<TcpStream>>, HandshakeResponse), GatewayError>
    {
        let target = self.rewrite_target(raw);
        let mut request = target.as_str().into_client_request()?;
        if !subprotocols.is_empty() {
            if let Ok(value) = tungstenite::http::HeaderValue::from_str(&subprotocols.join(", ")) {
                request
                    .headers_mut()
                    .insert("sec-websocket-protocol", value);
            }
        }
        Ok(connect_async(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory(origin: &str) -> SocketFactory {
        SocketFactory::new(InterceptionRule::new(
            "generativelanguage.googleapis.com",
            Url::parse(origin).unwrap(),
            "/proxy",
        ))
    }

    #[test]
    fn rewrites_upstream_dials_to_gateway_origin() {
        let factory = factory("https://app.example.com");
        assert_eq!(
            factory.rewrite_target("wss://generativelanguage.googleapis.com/v1/stream"),
            "wss://app.example.com/proxy/v1/stream"
        );
    }

    #[test]
    fn scheme_follows_gateway_origin() {
        let factory = factory("http://localhost:8080");
        assert_eq!(
            factory.rewrite_target("wss://generativelanguage.googleapis.com/v1/stream?alt=json"),
            "ws://localhost:8080/proxy/v1/stream?alt=json"
        );
    }

    #[test]
    fn non_matching_and_malformed_targets_pass_through() {
        let factory = factory("https://app.example.com");
        assert_eq!(
            factory.rewrite_target("wss://chat.example.org/socket"),
            "wss://chat.example.org/socket"
        );
        assert_eq!(factory.rewrite_target("not a url"), "not a url");
    }
}
