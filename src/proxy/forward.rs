//! HTTP proxy route.
//!
//! # Responsibilities
//! - Short-circuit CORS preflight requests
//! - Rewrite the request target to the upstream base, preserving path + query
//! - Filter hop-by-hop and WebSocket-negotiation headers
//! - Inject the credential header (overwriting any client-supplied value)
//! - Stream request and response bodies without buffering
//!
//! # Design Decisions
//! - Responses may be large or token-streamed, so the upstream body is piped
//!   through `Body::from_stream` rather than collected
//! - A failure before upstream headers arrive yields a structured 502; a
//!   failure mid-stream terminates the downstream body (the status line is
//!   already gone)
//! - Without a credential the request is still forwarded, just unauthenticated

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::error::GatewayError;
use crate::http::server::AppState;
use crate::proxy::rewrite::upstream_url;

/// Headers that must not travel between downstream and upstream.
///
/// Hop-by-hop headers per RFC 9110 §7.6.1, plus the WebSocket negotiation
/// set (an Upgrade never crosses the HTTP leg of the proxy).
const STRIPPED_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_stripped(name: &HeaderName) -> bool {
    let name = name.as_str();
    STRIPPED_HEADERS.contains(&name)
        || name.starts_with("sec-websocket-")
        || name == "host"
        || name == "content-length"
}

/// True for methods that carry a request body through the proxy.
pub fn method_allows_body(method: &Method) -> bool {
    !matches!(
        *method,
        Method::GET | Method::HEAD | Method::DELETE | Method::OPTIONS | Method::TRACE
    )
}

/// Build the outgoing header map for an upstream request.
///
/// `Content-Type` follows method semantics: omitted for GET/DELETE, defaulted
/// to `application/json` for POST/PUT/PATCH when the client sent none.
pub fn filter_request_headers(incoming: &HeaderMap, method: &Method) -> HeaderMap {
    let mut outgoing = HeaderMap::with_capacity(incoming.len());
    for (name, value) in incoming {
        if !is_stripped(name) {
            outgoing.append(name.clone(), value.clone());
        }
    }

    match *method {
        Method::GET | Method::DELETE => {
            outgoing.remove(header::CONTENT_TYPE);
        }
        Method::POST | Method::PUT | Method::PATCH => {
            if !outgoing.contains_key(header::CONTENT_TYPE) {
                outgoing.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
            }
        }
        _ => {}
    }

    outgoing
}

/// Permissive CORS preflight response: 200, no body, no upstream call.
pub fn preflight() -> Response {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                "GET, POST, PUT, PATCH, DELETE, OPTIONS",
            ),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "*"),
            (header::ACCESS_CONTROL_MAX_AGE, "86400"),
        ],
    )
        .into_response()
}

/// Forward one proxied HTTP exchange to the upstream base.
///
/// The incoming URI already has the proxy prefix stripped by the router nest.
/// Failures before an upstream response arrives map to the structured 502 at
/// this edge; later failures can only terminate the already-started body.
pub async fn forward(state: AppState, request: Request<Body>) -> Response {
    let request_id = uuid::Uuid::new_v4();
    match proxy_exchange(&state, request_id, request).await {
        Ok(response) => response,
        Err(error) => upstream_error_response(request_id, &error),
    }
}

async fn proxy_exchange(
    state: &AppState,
    request_id: uuid::Uuid,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    let (parts, body) = request.into_parts();

    let target = upstream_url(
        &state.config.upstream.http_base,
        parts.uri.path(),
        parts.uri.query(),
    )?;

    let mut headers = filter_request_headers(&parts.headers, &parts.method);
    if let Some(credential) = &state.credential {
        match (
            HeaderName::from_bytes(state.config.upstream.credential_header.as_bytes()),
            HeaderValue::from_str(credential.expose()),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => {
                tracing::error!(request_id = %request_id, "Credential header is not representable");
            }
        }
    }

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        target = %target,
        "Proxying request"
    );

    let mut upstream_request = state
        .client
        .request(parts.method.clone(), target)
        .headers(headers);
    if method_allows_body(&parts.method) {
        upstream_request =
            upstream_request.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    let upstream = upstream_request.send().await?;
    let status = upstream.status();
    tracing::debug!(request_id = %request_id, status = %status, "Upstream responded");

    let mut builder = Response::builder().status(status);
    for (name, value) in upstream.headers() {
        if !is_stripped(name) || *name == header::CONTENT_LENGTH {
            builder = builder.header(name, value);
        }
    }
    // Mid-stream upstream errors surface as a body error, which terminates
    // the downstream connection without further payload.
    Ok(builder
        .body(Body::from_stream(upstream.bytes_stream()))
        .unwrap_or_else(|e| {
            tracing::error!(request_id = %request_id, error = %e, "Failed to assemble response");
            StatusCode::BAD_GATEWAY.into_response()
        }))
}

/// Structured 502 for failures before any upstream response was received.
fn upstream_error_response(request_id: uuid::Uuid, error: &GatewayError) -> Response {
    tracing::error!(
        request_id = %request_id,
        error = %error,
        "Upstream request failed"
    );
    (
        StatusCode::BAD_GATEWAY,
        Json(serde_json::json!({
            "error": {
                "code": 502,
                "message": "upstream request failed",
                "status": "BAD_GATEWAY",
            }
        })),
    )
        .into_response()
}
