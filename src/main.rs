//! Sticky gateway
//!
//! An API gateway that pins each client to one instance of a backend service by
//! hashing the client's IP address.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ routing ──▶ filter chain ─────────────────────┐
//!                                                   10000 route → request URL       │
//!                                                   10150 iphash:// → instance URL  │
//!                                                        │                          │
//!                                                        ▼                          │
//!                                              load_balancer (FNV-1a % pool)        │
//!                                                        │                          │
//!                                                        ▼                          ▼
//!                                              discovery (instance snapshot)   hyper client ──▶ Backend
//!
//!     Cross-cutting: config (+ hot reload), observability, lifecycle, admin API
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use sticky_gateway::admin::setup_admin_router;
use sticky_gateway::config::loader::load_config;
use sticky_gateway::config::watcher::ConfigWatcher;
use sticky_gateway::lifecycle::signals::shutdown_signal;
use sticky_gateway::observability::{logging, metrics};
use sticky_gateway::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "sticky-gateway", version, about = "Client-affinity API gateway")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args.config)?;
    if args.check {
        println!("{}: configuration is valid", args.config.display());
        return Ok(());
    }

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sticky-gateway starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        bound_services = ?config.affinity.services,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let (watcher, config_updates) = ConfigWatcher::new(&args.config);
    let _watcher = match watcher.run() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Config hot reload disabled");
            None
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config.clone());

    let admin = if config.admin.enabled {
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");
        let app = setup_admin_router(server.state());
        let mut stop = shutdown.subscribe();
        Some(tokio::spawn(async move {
            let result = axum::serve(admin_listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop.recv().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin server failed");
            }
        }))
    } else {
        None
    };

    let signal = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal.trigger();
    });

    server.run(listener, config_updates, shutdown.subscribe()).await?;

    if let Some(admin) = admin {
        let _ = admin.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
