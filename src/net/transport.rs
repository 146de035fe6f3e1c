//! Shared pooled HTTP client used by every dispatcher.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::{Client, Error as ClientError};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use thiserror::Error;

use crate::config::schema::TransportConfig;
use crate::net::tls;

/// Error building the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("TLS setup failed: {0}")]
    Tls(#[from] rustls::Error),
}

/// Pooled keep-alive HTTP(S) client.
///
/// Cloning is cheap and clones share one connection pool, so build it once
/// and hand clones to every dispatcher.
#[derive(Clone, Debug)]
pub struct Transport {
    client: Client<HttpsConnector<HttpConnector>, Body>,
}

impl Transport {
    /// Build the client from its tuning knobs.
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_nodelay(true);
        http.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));
        http.set_keepalive(Some(Duration::from_secs(config.tcp_keepalive_secs)));
        http.set_happy_eyeballs_timeout(Some(Duration::from_millis(config.happy_eyeballs_ms)));

        let https = HttpsConnectorBuilder::new()
            .with_tls_config(tls::client_config(config.insecure_skip_verify)?)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build(https);

        tracing::debug!(
            connect_timeout_secs = config.connect_timeout_secs,
            pool_idle_timeout_secs = config.pool_idle_timeout_secs,
            pool_max_idle_per_host = config.pool_max_idle_per_host,
            insecure_skip_verify = config.insecure_skip_verify,
            "Transport built"
        );

        Ok(Self { client })
    }

    /// Send a request, resolving once response headers arrive.
    pub async fn send(&self, req: Request<Body>) -> Result<Response<Incoming>, ClientError> {
        self.client.request(req).await
    }
}
