//! Transparent upstream gateway.
//!
//! A single-process, event-driven proxy built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                   GATEWAY                    │
//!   Browser request      │  ┌──────────┐   ┌───────────┐               │
//!   ─────────────────────┼─▶│  http    │──▶│  proxy    │───────────────┼──▶ Upstream API
//!   {prefix}/**          │  │  server  │   │  forward  │  + credential │    (HTTP)
//!                        │  └──────────┘   └───────────┘    header     │
//!   Browser upgrade      │  ┌──────────┐   ┌───────────┐               │
//!   ─────────────────────┼─▶│  http    │──▶│  proxy    │───────────────┼──▶ Upstream API
//!   {prefix}/** (WS)     │  │  server  │   │ websocket │  + credential │    (WebSocket)
//!                        │  └──────────┘   └───────────┘    query      │
//!                        │                                              │
//!                        │  ┌────────────────────────────────────────┐ │
//!                        │  │          Cross-Cutting Concerns        │ │
//!                        │  │  config │ credential │ rate limit │    │ │
//!                        │  │  observability │ static site          │ │
//!                        │  └────────────────────────────────────────┘ │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use upstream_gateway::config::{load_config, GatewayConfig};
use upstream_gateway::credential::{Credential, CREDENTIAL_ENV_VARS};
use upstream_gateway::GatewayServer;

/// Transparent upstream gateway.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listener port from the config file.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(port) = cli.port {
        let mut addr: SocketAddr = config.listener.bind_address.parse()?;
        addr.set_port(port);
        config.listener.bind_address = addr.to_string();
    }

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "upstream_gateway={},tower_http=info",
                    config.observability.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("upstream-gateway v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        proxy_prefix = %config.upstream.proxy_prefix,
        upstream = %config.upstream.http_base,
        "Configuration loaded"
    );

    // Missing credential degrades proxying; it never stops startup.
    let credential = Credential::from_env();
    if credential.is_none() {
        tracing::warn!(
            checked = ?CREDENTIAL_ENV_VARS,
            "No upstream credential configured; HTTP proxying runs unauthenticated and \
             WebSocket upgrades will be rejected"
        );
    }

    // Bind failure (port taken, privileges) is fatal.
    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let server = GatewayServer::new(config, credential);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
