//! WebSocket bridge.
//!
//! # Responsibilities
//! - Detect Upgrade requests under the proxy prefix
//! - Complete the downstream handshake, forwarding the offered subprotocols
//! - Dial the upstream WS base with the credential appended as a query parameter
//! - Relay frames in both directions without inspection
//!
//! # State Machine
//! ```text
//! CONNECTING_UPSTREAM ──▶ OPEN ──▶ CLOSED
//! ```
//! While `CONNECTING_UPSTREAM`, frames arriving from downstream are queued in
//! arrival order, then drained before any live frame once the upstream opens.
//!
//! # Design Decisions
//! - Closure of either side closes the other with the same close code
//! - Upstream transport errors close downstream with a distinguished code
//!   ([`UPSTREAM_ERROR_CLOSE_CODE`]) so clients can tell proxy failures from
//!   application-level closes
//! - No credential configured: the upgrade is refused before any handshake
//!   completes, with `Connection: close` so the transport is not left half-open

use std::collections::VecDeque;

use axum::{
    body::Body,
    extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    extract::FromRequestParts,
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        self, client::IntoClientRequest, protocol::frame::coding::CloseCode,
        Message as UpstreamMessage,
    },
};
use url::Url;

use crate::credential::Credential;
use crate::error::GatewayError;
use crate::http::server::AppState;
use crate::proxy::rewrite::upstream_url;

/// Close code sent downstream when the upstream side fails, distinct from any
/// code an upstream application would send.
pub const UPSTREAM_ERROR_CLOSE_CODE: u16 = 4502;

/// True when the request asks for a WebSocket upgrade.
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    let wants_upgrade = headers
        .get(header::CONNECTION)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
        })
        .unwrap_or(false);
    let is_websocket = headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);
    wants_upgrade && is_websocket
}

/// Build the outbound upstream URL: WS base + path suffix + query, with the
/// credential appended as a query parameter.
fn bridge_target(
    state: &AppState,
    path: &str,
    query: Option<&str>,
    credential: &Credential,
) -> Result<Url, url::ParseError> {
    let mut target = upstream_url(&state.config.upstream.ws_base, path, query)?;
    target
        .query_pairs_mut()
        .append_pair(
            &state.config.upstream.credential_query_param,
            credential.expose(),
        );
    Ok(target)
}

/// Handle an Upgrade request under the proxy prefix.
pub async fn handle_upgrade(state: AppState, request: Request<Body>) -> Response {
    let Some(credential) = state.credential.clone() else {
        tracing::warn!("WebSocket upgrade rejected: no upstream credential configured");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONNECTION, "close")],
            "upstream credential not configured",
        )
            .into_response();
    };

    let (mut parts, _body) = request.into_parts();
    let target = match bridge_target(&state, parts.uri.path(), parts.uri.query(), &credential) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build upstream WebSocket URL");
            return (StatusCode::BAD_GATEWAY, "Invalid upstream target").into_response();
        }
    };

    // Every offered subprotocol, in offer order. The full list travels
    // upstream so the upstream gets to negotiate; the downstream handshake
    // echoes the first offer, since it must complete before the dial starts.
    let offered: Vec<String> = parts
        .headers
        .get_all(header::SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();

    let mut upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };
    if !offered.is_empty() {
        upgrade = upgrade.protocols(offered.clone());
    }

    upgrade.on_upgrade(move |downstream| async move {
        let host = target.host_str().unwrap_or("-").to_string();
        let path = target.path().to_string();
        if let Err(e) = bridge(downstream, target, offered).await {
            // `e` never carries the credential; the target URL is not logged
            // whole because its query string does.
            tracing::warn!(upstream_host = %host, upstream_path = %path, error = %e, "WebSocket bridge ended with error");
        } else {
            tracing::debug!(upstream_host = %host, upstream_path = %path, "WebSocket bridge closed");
        }
    })
}

/// Run one bridge to completion.
///
/// Phase 1 dials the upstream while buffering downstream frames; phase 2 pumps
/// frames both ways until either side closes.
async fn bridge(
    mut downstream: WebSocket,
    target: Url,
    offered: Vec<String>,
) -> Result<(), GatewayError> {
    let mut request = target.as_str().into_client_request()?;
    if !offered.is_empty() {
        if let Ok(value) = tungstenite::http::HeaderValue::from_str(&offered.join(", ")) {
            request
                .headers_mut()
                .insert("sec-websocket-protocol", value);
        }
    }

    // CONNECTING_UPSTREAM: buffer downstream frames in arrival order.
    let connect = connect_async(request);
    tokio::pin!(connect);
    let mut pending: VecDeque<Message> = VecDeque::new();

    let (upstream, _handshake) = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok(pair) => break pair,
                Err(e) => {
                    let _ = downstream
                        .send(Message::Close(Some(upstream_error_close())))
                        .await;
                    return Err(e.into());
                }
            },
            frame = downstream.recv() => match frame {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    // Downstream gave up before the upstream opened; dropping
                    // the connect future aborts the dial.
                    return Ok(());
                }
                Some(Ok(frame)) => pending.push_back(frame),
            },
        }
    };

    // OPEN: drain the queue strictly in arrival order, then relay live frames.
    let (mut upstream_tx, mut upstream_rx) = upstream.split();
    while let Some(frame) = pending.pop_front() {
        if let Err(e) = upstream_tx.send(to_upstream(frame)).await {
            let _ = downstream
                .send(Message::Close(Some(upstream_error_close())))
                .await;
            return Err(e.into());
        }
    }

    let (mut downstream_tx, mut downstream_rx) = downstream.split();
    loop {
        tokio::select! {
            frame = downstream_rx.next() => match frame {
                Some(Ok(Message::Close(close))) => {
                    let _ = upstream_tx
                        .send(UpstreamMessage::Close(close.map(close_to_upstream)))
                        .await;
                    break;
                }
                Some(Ok(frame)) => {
                    if let Err(e) = upstream_tx.send(to_upstream(frame)).await {
                        let _ = downstream_tx
                            .send(Message::Close(Some(upstream_error_close())))
                            .await;
                        return Err(e.into());
                    }
                }
                Some(Err(_)) | None => {
                    // Abrupt downstream disconnect; tear the upstream down.
                    let _ = upstream_tx.send(UpstreamMessage::Close(None)).await;
                    break;
                }
            },
            frame = upstream_rx.next() => match frame {
                Some(Ok(UpstreamMessage::Close(close))) => {
                    let _ = downstream_tx
                        .send(Message::Close(close.map(close_from_upstream)))
                        .await;
                    break;
                }
                Some(Ok(frame)) => {
                    if let Some(frame) = from_upstream(frame) {
                        if downstream_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Err(e)) => {
                    let _ = downstream_tx
                        .send(Message::Close(Some(upstream_error_close())))
                        .await;
                    return Err(e.into());
                }
                None => {
                    let _ = downstream_tx.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }

    Ok(())
}

fn upstream_error_close() -> CloseFrame {
    CloseFrame {
        code: UPSTREAM_ERROR_CLOSE_CODE,
        reason: "upstream error".into(),
    }
}

/// Downstream frame → upstream frame. Payloads pass through untouched.
fn to_upstream(frame: Message) -> UpstreamMessage {
    match frame {
        Message::Text(text) => UpstreamMessage::Text(text.as_str().into()),
        Message::Binary(bytes) => UpstreamMessage::Binary(bytes),
        Message::Ping(bytes) => UpstreamMessage::Ping(bytes),
        Message::Pong(bytes) => UpstreamMessage::Pong(bytes),
        Message::Close(close) => UpstreamMessage::Close(close.map(close_to_upstream)),
    }
}

/// Upstream frame → downstream frame. Raw `Frame` never appears on read.
fn from_upstream(frame: UpstreamMessage) -> Option<Message> {
    match frame {
        UpstreamMessage::Text(text) => Some(Message::Text(text.as_str().into())),
        UpstreamMessage::Binary(bytes) => Some(Message::Binary(bytes)),
        UpstreamMessage::Ping(bytes) => Some(Message::Ping(bytes)),
        UpstreamMessage::Pong(bytes) => Some(Message::Pong(bytes)),
        UpstreamMessage::Close(close) => Some(Message::Close(close.map(close_from_upstream))),
        UpstreamMessage::Frame(_) => None,
    }
}

fn close_to_upstream(frame: CloseFrame) -> tungstenite::protocol::CloseFrame {
    tungstenite::protocol::CloseFrame {
        code: CloseCode::from(frame.code),
        reason: frame.reason.as_str().into(),
    }
}

fn close_from_upstream(frame: tungstenite::protocol::CloseFrame) -> CloseFrame {
    CloseFrame {
        code: u16::from(frame.code),
        reason: frame.reason.as_str().into(),
    }
}
