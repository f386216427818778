//! Static site serving.
//!
//! Non-proxy paths serve files from the configured root. The HTML entry point
//! is templated: when a credential is configured its `<head>` gains the two
//! interceptor bootstrap scripts, and is left untouched otherwise.

pub mod bootstrap;

use std::path::Path;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};

use crate::http::server::AppState;
use bootstrap::{bootstrap_scripts, inject_bootstrap_scripts};

/// Serve the templated HTML entry point.
pub async fn index_handler(State(state): State<AppState>) -> Response {
    let path = Path::new(&state.config.site.root).join(&state.config.site.index);
    let html = match tokio::fs::read_to_string(&path).await {
        Ok(html) => html,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to read entry point");
            return (StatusCode::NOT_FOUND, "entry point not found").into_response();
        }
    };

    if state.credential.is_none() {
        return Html(html).into_response();
    }

    let Some(upstream_host) = state.config.upstream.upstream_host() else {
        tracing::error!("Upstream base has no host; serving entry point unmodified");
        return Html(html).into_response();
    };
    let scripts = bootstrap_scripts(&upstream_host, &state.config.upstream.proxy_prefix);
    let html = inject_bootstrap_scripts(&html, &scripts);

    (
        [(header::CACHE_CONTROL, "no-store")],
        Html(html),
    )
        .into_response()
}
