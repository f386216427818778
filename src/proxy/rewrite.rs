//! URL rewriting between the upstream host and the gateway origin.
//!
//! # Responsibilities
//! - Decide whether a URL targets the upstream host
//! - Substitute the upstream base with `{own_origin}{proxy_prefix}` while
//!   preserving path and query byte-for-byte
//! - Mirror the WebSocket scheme off the gateway origin (`https` → `wss`)
//!
//! # Design Decisions
//! - Pure functions over a static [`InterceptionRule`]; no I/O, no globals
//! - Non-matching or malformed input is "not our concern": callers get `None`
//!   and pass the original through unchanged

use url::Url;

/// Static rewrite rule, constant for the process lifetime.
///
/// Drives the client-side interceptors; the server side strips the prefix at
/// the router nest instead.
#[derive(Debug, Clone)]
pub struct InterceptionRule {
    upstream_host: String,
    own_origin: Url,
    proxy_prefix: String,
}

impl InterceptionRule {
    /// Build a rule from the upstream host, the gateway's own origin
    /// (e.g. `https://app.example.com`) and the proxy prefix (e.g. `/proxy`).
    pub fn new(
        upstream_host: impl Into<String>,
        own_origin: Url,
        proxy_prefix: impl Into<String>,
    ) -> Self {
        Self {
            upstream_host: upstream_host.into().to_lowercase(),
            own_origin,
            proxy_prefix: proxy_prefix.into(),
        }
    }

    /// Returns true if `url` points at the upstream host.
    ///
    /// Host comparison is case-insensitive per RFC 3986; everything else
    /// (path, query) never participates in the match.
    pub fn matches(&self, url: &Url) -> bool {
        url.host_str()
            .map(|h| h.eq_ignore_ascii_case(&self.upstream_host))
            .unwrap_or(false)
    }

    /// Rewrite an upstream HTTP(S) URL to the same-origin proxy path.
    ///
    /// Path and query survive byte-for-byte; only scheme, authority and the
    /// leading prefix change. Non-matching URLs yield `None`.
    pub fn rewrite_http(&self, url: &Url) -> Option<Url> {
        if !self.matches(url) {
            return None;
        }
        self.splice(self.own_origin.scheme(), url)
    }

    /// Rewrite an upstream WS(S) URL to the same-origin proxy path, with the
    /// scheme mirroring the gateway origin (`https` → `wss`, `http` → `ws`).
    pub fn rewrite_ws(&self, url: &Url) -> Option<Url> {
        if !self.matches(url) {
            return None;
        }
        let scheme = if self.own_origin.scheme() == "https" {
            "wss"
        } else {
            "ws"
        };
        self.splice(scheme, url)
    }

    fn splice(&self, scheme: &str, url: &Url) -> Option<Url> {
        let authority = self.own_origin.authority();
        let mut rewritten = format!(
            "{}://{}{}{}",
            scheme,
            authority,
            self.proxy_prefix,
            url.path()
        );
        if let Some(query) = url.query() {
            rewritten.push('?');
            rewritten.push_str(query);
        }
        Url::parse(&rewritten).ok()
    }
}

/// Join an upstream base URL with a path suffix and optional query string.
///
/// The suffix and query are appended verbatim; no percent re-encoding happens
/// here, preserving whatever bytes the client sent.
pub fn upstream_url(base: &str, suffix: &str, query: Option<&str>) -> Result<Url, url::ParseError> {
    let mut target = format!("{}{}", base.trim_end_matches('/'), suffix);
    if let Some(query) = query {
        target.push('?');
        target.push_str(query);
    }
    Url::parse(&target)
}
