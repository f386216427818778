//! HTTP request interception.
//!
//! # Responsibilities
//! - Rewrite upstream-host requests to the same-origin proxy path
//! - Copy only safelisted headers onto rewritten requests
//! - Resolve network failures to a synthetic 502 response instead of an error
//!
//! # Design Decisions
//! - Non-matching requests pass through with their headers intact
//! - The safelist drops everything but content negotiation headers; values the
//!   rewritten destination does not expect never leak across the origin switch

use axum::http::{header, HeaderMap, Method, StatusCode};
use url::Url;

use crate::proxy::forward::method_allows_body;
use crate::proxy::rewrite::InterceptionRule;

/// Headers copied onto a rewritten request. Everything else is dropped.
pub const SAFE_REQUEST_HEADERS: [header::HeaderName; 3] = [
    header::ACCEPT,
    header::ACCEPT_LANGUAGE,
    header::CONTENT_TYPE,
];

/// Adapter that callers use in place of a raw HTTP client.
pub struct FetchInterceptor {
    rule: InterceptionRule,
    client: reqwest::Client,
}

impl FetchInterceptor {
    pub fn new(rule: InterceptionRule) -> Self {
        Self {
            rule,
            client: reqwest::Client::new(),
        }
    }

    /// The rewritten target for `url`, or `None` when it is not our concern.
    pub fn rewrite(&self, url: &Url) -> Option<Url> {
        self.rule.rewrite_http(url)
    }

    fn safelisted(headers: &HeaderMap) -> HeaderMap {
        let mut outgoing = HeaderMap::new();
        for name in SAFE_REQUEST_HEADERS {
            if let Some(value) = headers.get(&name) {
                outgoing.insert(name, value.clone());
            }
        }
        outgoing
    }

    /// Perform a request, transparently diverting upstream-host targets
    /// through the gateway.
    ///
    /// Always resolves to a response: network failures on the proxied path
    /// become a synthetic 502 so callers holding a response type keep working.
    pub async fn fetch(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<reqwest::Body>,
    ) -> reqwest::Response {
        let (target, outgoing) = match self.rule.rewrite_http(&url) {
            Some(rewritten) => (rewritten, Self::safelisted(&headers)),
            None => (url, headers),
        };

        let mut request = self.client.request(method.clone(), target.clone()).headers(outgoing);
        if let Some(body) = body {
            if method_allows_body(&method) {
                request = request.body(body);
            }
        }

        match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(target = %target, error = %e, "Proxied fetch failed");
                synthetic_bad_gateway()
            }
        }
    }
}

/// Fixed 502 JSON response standing in for an unreachable gateway.
fn synthetic_bad_gateway() -> reqwest::Response {
    let body = serde_json::json!({
        "error": {
            "code": 502,
            "message": "proxied fetch failed",
            "status": "BAD_GATEWAY",
        }
    });
    let response = axum::http::Response::builder()
        .status(StatusCode::BAD_GATEWAY)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .expect("static response parts are valid");
    reqwest::Response::from(response)
}
