//! Browser bootstrap scripts and HTML head injection.
//!
//! # Responsibilities
//! - Render the two interceptor scripts with the upstream host and prefix
//! - Splice them into the entry point's `<head>`
//!
//! # Design Decisions
//! - Injection is a pure `String → String` function, decoupled from any
//!   templating machinery, so it is testable in isolation
//! - The scripts mirror the Rust rewrite rules and never see the credential

/// Fetch interceptor installed in the worker/background context.
///
/// Placeholders: `{{upstream_host}}`, `{{proxy_prefix}}`.
const FETCH_INTERCEPTOR_JS: &str = r#"(() => {
  const UPSTREAM_HOST = "{{upstream_host}}";
  const PROXY_PREFIX = "{{proxy_prefix}}";
  const SAFE_HEADERS = ["accept", "accept-language", "content-type"];
  const nativeFetch = self.fetch.bind(self);
  self.fetch = async (input, init) => {
    const request = new Request(input, init);
    let url;
    try { url = new URL(request.url); } catch { return nativeFetch(input, init); }
    if (url.host !== UPSTREAM_HOST) return nativeFetch(input, init);
    const target = new URL(PROXY_PREFIX + url.pathname + url.search, self.location.origin);
    const headers = new Headers();
    for (const name of SAFE_HEADERS) {
      const value = request.headers.get(name);
      if (value) headers.set(name, value);
    }
    const hasBody = request.body != null && !["GET", "HEAD"].includes(request.method);
    try {
      return await nativeFetch(new Request(target, {
        method: request.method,
        headers,
        body: hasBody ? request.body : undefined,
        duplex: hasBody ? "half" : undefined,
      }));
    } catch (err) {
      return new Response(
        JSON.stringify({ error: { code: 502, message: String(err), status: "BAD_GATEWAY" } }),
        { status: 502, headers: { "content-type": "application/json" } },
      );
    }
  };
})();"#;

/// WebSocket constructor wrapper installed in the page context.
///
/// A `Proxy` around the native constructor keeps static constants
/// (`WebSocket.OPEN` and friends) and the prototype chain intact.
const WS_INTERCEPTOR_JS: &str = r#"(() => {
  const UPSTREAM_HOST = "{{upstream_host}}";
  const PROXY_PREFIX = "{{proxy_prefix}}";
  const NativeWebSocket = window.WebSocket;
  const rewrite = (raw) => {
    try {
      const url = new URL(raw);
      if (url.host !== UPSTREAM_HOST) return raw;
      const scheme = window.location.protocol === "https:" ? "wss:" : "ws:";
      return scheme + "//" + window.location.host + PROXY_PREFIX + url.pathname + url.search;
    } catch {
      return raw;
    }
  };
  window.WebSocket = new Proxy(NativeWebSocket, {
    construct(target, args) {
      const [url, protocols] = args;
      return Reflect.construct(target, [rewrite(String(url)), protocols]);
    },
  });
})();"#;

fn render(template: &str, upstream_host: &str, proxy_prefix: &str) -> String {
    template
        .replace("{{upstream_host}}", upstream_host)
        .replace("{{proxy_prefix}}", proxy_prefix)
}

/// The two inline scripts for an entry point, in injection order.
pub fn bootstrap_scripts(upstream_host: &str, proxy_prefix: &str) -> [String; 2] {
    [
        render(FETCH_INTERCEPTOR_JS, upstream_host, proxy_prefix),
        render(WS_INTERCEPTOR_JS, upstream_host, proxy_prefix),
    ]
}

/// Splice inline script tags into the document head.
///
/// Returns the HTML unchanged when no `</head>` is present.
pub fn inject_bootstrap_scripts(html: &str, scripts: &[String]) -> String {
    let Some(at) = html.find("</head>") else {
        tracing::warn!("Entry point has no </head>; interceptors not injected");
        return html.to_string();
    };
    let mut out = String::with_capacity(html.len() + scripts.iter().map(String::len).sum::<usize>());
    out.push_str(&html[..at]);
    for script in scripts {
        out.push_str("<script>");
        out.push_str(script);
        out.push_str("</script>\n");
    }
    out.push_str(&html[at..]);
    out
}
