//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, Uri},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use upstream_gateway::{Credential, GatewayConfig, GatewayServer};

/// Start a gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig, credential: Option<Credential>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = GatewayServer::new(config, credential);
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });
    addr
}

/// Gateway config pointed at a mock upstream, with rate limiting left at its
/// defaults unless the test overrides it.
pub fn gateway_config(http_upstream: Option<SocketAddr>, ws_upstream: Option<SocketAddr>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    if let Some(addr) = http_upstream {
        config.upstream.http_base = format!("http://{}", addr);
    }
    if let Some(addr) = ws_upstream {
        config.upstream.ws_base = format!("ws://{}", addr);
    }
    config
}

/// Start a mock HTTP upstream that echoes every request back as JSON and
/// counts how many requests actually reached it.
pub async fn start_mock_upstream() -> (SocketAddr, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));

    async fn echo(
        State(hits): State<Arc<AtomicUsize>>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> Json<Value> {
        hits.fetch_add(1, Ordering::SeqCst);
        let headers: serde_json::Map<String, Value> = headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
                )
            })
            .collect();
        Json(json!({
            "method": method.as_str(),
            "path": uri.path(),
            "query": uri.query(),
            "headers": headers,
            "body": String::from_utf8_lossy(&body),
        }))
    }

    let app = Router::new().fallback(echo).with_state(hits.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, hits)
}

/// What the mock WebSocket upstream observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamEvent {
    /// Handshake completed; full request URI and offered subprotocol.
    Handshake {
        uri: String,
        subprotocol: Option<String>,
    },
    /// Text frame received.
    Text(String),
    /// Close frame received (code, if any).
    Close(Option<u16>),
}

/// Start a mock WebSocket upstream.
///
/// The handshake is delayed by `accept_delay`, which keeps a bridge in its
/// connecting state long enough for buffering tests. Text frames are echoed
/// back as `echo:<text>`, except `please-close`, which makes the upstream
/// initiate a close with code 4001.
pub async fn start_mock_ws_upstream(
    accept_delay: Duration,
) -> (SocketAddr, mpsc::UnboundedReceiver<UpstreamEvent>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (events, observed) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let events = events.clone();
            tokio::spawn(async move {
                tokio::time::sleep(accept_delay).await;

                let events_for_handshake = events.clone();
                let callback = move |request: &tokio_tungstenite::tungstenite::handshake::server::Request,
                                     response: tokio_tungstenite::tungstenite::handshake::server::Response| {
                    let subprotocol = request
                        .headers()
                        .get("sec-websocket-protocol")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    let _ = events_for_handshake.send(UpstreamEvent::Handshake {
                        uri: request.uri().to_string(),
                        subprotocol,
                    });
                    Ok(response)
                };

                let ws = match tokio_tungstenite::accept_hdr_async(stream, callback).await {
                    Ok(ws) => ws,
                    Err(_) => return,
                };
                let (mut tx, mut rx) = ws.split();

                while let Some(Ok(message)) = rx.next().await {
                    match message {
                        Message::Text(text) => {
                            let text = text.as_str().to_string();
                            let _ = events.send(UpstreamEvent::Text(text.clone()));
                            if text == "please-close" {
                                let _ = tx
                                    .send(Message::Close(Some(
                                        tokio_tungstenite::tungstenite::protocol::CloseFrame {
                                            code: 4001.into(),
                                            reason: "upstream done".into(),
                                        },
                                    )))
                                    .await;
                                break;
                            }
                            let _ = tx.send(Message::Text(format!("echo:{}", text).into())).await;
                        }
                        Message::Close(frame) => {
                            let _ = events.send(UpstreamEvent::Close(
                                frame.map(|f| u16::from(f.code)),
                            ));
                            break;
                        }
                        _ => {}
                    }
                }
            });
        }
    });

    (addr, observed)
}

/// Start a mock WebSocket upstream that completes the handshake after
/// `accept_delay` and then drops the connection without a close frame.
pub async fn start_vanishing_ws_upstream(accept_delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                tokio::time::sleep(accept_delay).await;
                // the stream is dropped as soon as the handshake completes
                let _ = tokio_tungstenite::accept_async(stream).await;
            });
        }
    });

    addr
}

/// Start a raw TCP upstream that answers with response headers and a partial
/// chunked body, then drops the connection before the body completes.
pub async fn start_truncating_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 4096];
                loop {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => {
                            request.extend_from_slice(&buf[..n]);
                            if request.windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                        }
                    }
                }

                let head = "HTTP/1.1 200 OK\r\n\
                            content-type: application/json\r\n\
                            transfer-encoding: chunked\r\n\r\n";
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.write_all(b"7\r\npartial\r\n").await;
                let _ = stream.flush().await;
                tokio::time::sleep(Duration::from_millis(50)).await;
                // dropped without the terminal chunk: the body is truncated
            });
        }
    });

    addr
}

/// A reqwest client without pooling or ambient proxies, for test stability.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Give a spawned server a moment to start accepting.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}
