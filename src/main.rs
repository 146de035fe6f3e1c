//! HTTP backend gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ http::context (RequestContext)
//!                          │
//!                          ├──▶ mirror Dispatcher ──(spawned)──▶ shadow backend
//!                          │                                     (response drained)
//!                          ▼
//!                     primary Dispatcher
//!                          │  cache? → load_balancer → adaptor
//!                          ▼
//!                     net::Transport (one pooled client) ──────▶ Backend Server
//!                          │
//!     Client Response      ▼
//!     ◀────────────── status + headers + DurationBody
//!                          │
//!                     observability: code counter, metrics, tags, access log
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use http_backend::admin::setup_admin_router;
use http_backend::config::load_config;
use http_backend::config::watcher::ConfigWatcher;
use http_backend::observability::{logging, metrics};
use http_backend::{HttpServer, Shutdown, Transport};

#[derive(Parser)]
#[command(name = "http-backend")]
#[command(about = "Load-balancing HTTP backend gateway", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,

    /// Do not watch the configuration file for changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args.config)?;
    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        bind_address = %config.listener.bind_address,
        servers = config.backend.servers.len(),
        policy = %config.backend.load_balance.policy,
        mirror = config.mirror.is_some(),
        "http-backend starting"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?);
    }

    // One transport for the whole process; reloads reuse it.
    let transport = Transport::new(&config.transport)?;
    let server = HttpServer::new(&config, transport)?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    if config.admin.enabled {
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");
        let admin = setup_admin_router(server.state());
        let mut admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let result = axum::serve(admin_listener, admin)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin API failed");
            }
        });
    }

    let (watcher, config_updates) = ConfigWatcher::new(&args.config);
    let _watcher = if args.no_watch {
        None
    } else {
        match watcher.run() {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
                None
            }
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
