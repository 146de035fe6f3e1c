//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all gateway handler
//! - Build dispatchers from configuration and swap them on reload
//! - Run the primary dispatch and spawn the mirror dispatch per request
//! - Bind server to listener and shut down gracefully

use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, Response, StatusCode},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::trace::TraceLayer;

use crate::config::{ConfigError, GatewayConfig};
use crate::dispatch::{Dispatcher, HttpContext};
use crate::http::context::RequestContext;
use crate::net::Transport;

/// The dispatchers serving one configuration generation.
#[derive(Debug)]
pub struct Dispatchers {
    pub primary: Arc<Dispatcher>,
    pub mirror: Option<Arc<Dispatcher>>,
    pub mirror_body_limit: usize,
}

impl Dispatchers {
    /// Build fresh dispatchers for `config`, all sharing `transport`.
    pub fn build(config: &GatewayConfig, transport: &Transport) -> Result<Self, ConfigError> {
        let primary = Arc::new(Dispatcher::new(&config.backend, transport.clone())?);
        let mirror = config
            .mirror
            .as_ref()
            .map(|spec| Dispatcher::new(spec, transport.clone()).map(Arc::new))
            .transpose()?;

        Ok(Self {
            primary,
            mirror,
            mirror_body_limit: config.listener.mirror_body_limit,
        })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatchers: Arc<ArcSwap<Dispatchers>>,
    pub transport: Transport,
    pub admin_api_key: Arc<str>,
}

impl AppState {
    /// Replace the dispatchers with ones built from `config`.
    ///
    /// On error the current dispatchers stay in place.
    pub fn reload(&self, config: &GatewayConfig) -> Result<(), ConfigError> {
        let dispatchers = Dispatchers::build(config, &self.transport)?;
        self.dispatchers.store(Arc::new(dispatchers));
        Ok(())
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and shared transport.
    pub fn new(config: &GatewayConfig, transport: Transport) -> Result<Self, ConfigError> {
        let dispatchers = Dispatchers::build(config, &transport)?;
        let state = AppState {
            dispatchers: Arc::new(ArcSwap::from_pointee(dispatchers)),
            transport,
            admin_api_key: Arc::from(config.admin.api_key.as_str()),
        };

        let router = Self::build_router(state.clone());
        Ok(Self { router, state })
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// State shared with the admin API.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Validated configs received on `config_updates` replace the dispatchers.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match state.reload(&config) {
                    Ok(()) => tracing::info!(
                        servers = config.backend.servers.len(),
                        mirror = config.mirror.is_some(),
                        "Dispatchers reloaded"
                    ),
                    Err(e) => tracing::error!(error = %e, "Reload rejected, keeping current dispatchers"),
                }
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Gateway handler: mirror (if configured), then dispatch to the primary backend.
async fn gateway_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response<Body> {
    let dispatchers = state.dispatchers.load_full();
    let mut ctx = RequestContext::new(request, peer);

    if let Some(mirror) = &dispatchers.mirror {
        let limit = dispatchers.mirror_body_limit;
        match ctx.buffer_body(limit).await {
            Ok(Some(bytes)) => {
                tokio::spawn(mirror_request(mirror.clone(), ctx.mirror_copy(bytes)));
            }
            Ok(None) => {
                tracing::warn!(path = %ctx.path(), limit, "Request body too large to mirror, mirror skipped");
                ctx.add_tag(format!("mirrorBodyErr:body exceeds {limit} bytes"));
            }
            Err(e) => {
                tracing::warn!(path = %ctx.path(), error = %e, "Failed to read request body");
                ctx.set_status(StatusCode::BAD_REQUEST);
                ctx.add_tag(format!("mirrorBodyErr:{e}"));
                return ctx.into_response();
            }
        }
    }

    dispatchers.primary.handle_with_response(&mut ctx).await;
    ctx.into_response()
}

/// Send a mirrored copy and log its outcome.
async fn mirror_request(mirror: Arc<Dispatcher>, mut ctx: RequestContext) {
    mirror.handle_without_response(&mut ctx).await;

    let tags = ctx.tags().join(" | ");
    if ctx.tags().iter().any(|t| t.starts_with("mirrorBackendFailed:")) {
        tracing::warn!(
            method = %ctx.method(),
            path = %ctx.path(),
            client = %ctx.real_ip(),
            tags = %tags,
            "Mirror request failed"
        );
    } else {
        tracing::debug!(tags = %tags, "Mirror request finished");
    }
}
