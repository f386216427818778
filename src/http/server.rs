//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, rate limiting)
//! - Bind the server to a listener
//! - Dispatch proxy-prefix requests to the forwarders
//!
//! # Routing
//! ```text
//! {prefix}          ──▶ proxy_entry (HTTP forward | WS bridge | preflight)
//! {prefix}/{*path}  ──▶ proxy_entry
//! /                 ──▶ templated entry point
//! anything else     ──▶ static files
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    middleware,
    response::Response,
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::credential::Credential;
use crate::proxy::{forward, websocket};
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::site;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub credential: Option<Credential>,
    pub client: reqwest::Client,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: Arc<GatewayConfig>,
}

impl GatewayServer {
    /// Create a new server with the given configuration and credential.
    pub fn new(config: GatewayConfig, credential: Option<Credential>) -> Self {
        let config = Arc::new(config);
        let state = AppState {
            config: config.clone(),
            credential,
            client: reqwest::Client::new(),
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        let proxy_routes = Router::new()
            .route("/", any(proxy_entry))
            .route("/{*path}", any(proxy_entry))
            .layer(middleware::from_fn_with_state(
                limiter,
                rate_limit_middleware,
            ))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.upstream.request_timeout_secs,
            )));

        Router::new()
            .nest(&config.upstream.proxy_prefix, proxy_routes)
            .route("/", get(site::index_handler))
            .fallback_service(ServeDir::new(&config.site.root))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            proxy_prefix = %self.config.upstream.proxy_prefix,
            upstream = %self.config.upstream.http_base,
            "Gateway starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Entry point for everything under the proxy prefix.
///
/// Upgrade requests bridge to the upstream WebSocket base, `OPTIONS`
/// short-circuits to a CORS preflight, everything else forwards over HTTP.
async fn proxy_entry(State(state): State<AppState>, request: Request<Body>) -> Response {
    if websocket::is_upgrade_request(request.headers()) {
        return websocket::handle_upgrade(state, request).await;
    }
    if request.method() == Method::OPTIONS {
        return forward::preflight();
    }
    forward::forward(state, request).await
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
