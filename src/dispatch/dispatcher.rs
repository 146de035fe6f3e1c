//! Backend dispatcher: picks a server, forwards, records telemetry.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;

use crate::config::loader::ConfigError;
use crate::config::schema::BackendSpec;
use crate::config::validation::validate_backend;
use crate::dispatch::body::DurationBody;
use crate::dispatch::context::{AdaptedRequest, Adaptor, HttpContext, ResponseCache};
use crate::dispatch::error::DispatchError;
use crate::load_balancer::pool::{pick_servers, Server};
use crate::load_balancer::{LoadBalancer, Policy};
use crate::net::Transport;
use crate::observability::codes::{CodeCounter, CodeSnapshot};
use crate::observability::metrics;

/// Callback invoked on every successfully forwarded response.
pub type ResponseGotFn = Arc<dyn Fn(&mut dyn HttpContext) + Send + Sync>;

/// Forwards requests to one backend's servers.
///
/// Built once per backend configuration and replaced wholesale on reload.
pub struct Dispatcher {
    servers: Vec<Server>,
    balancer: LoadBalancer,
    codes: CodeCounter,
    transport: Transport,
    adaptor: Option<Arc<dyn Adaptor>>,
    cache: Option<Arc<dyn ResponseCache>>,
    response_got: Vec<ResponseGotFn>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("servers", &self.servers)
            .field("policy", self.balancer.policy())
            .field("adaptor", &self.adaptor.is_some())
            .field("cache", &self.cache.is_some())
            .field("response_got", &self.response_got.len())
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher from a backend spec.
    ///
    /// Fails if the backend is invalid, in particular if its tag filter picks no server.
    pub fn new(spec: &BackendSpec, transport: Transport) -> Result<Self, ConfigError> {
        let errors = validate_backend("backend", spec);
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        let servers = pick_servers(spec);
        let codes = CodeCounter::new(servers.iter().map(|s| s.url.as_str()));

        Ok(Self {
            balancer: LoadBalancer::new(Policy::from_config(&spec.load_balance)),
            servers,
            codes,
            transport,
            adaptor: None,
            cache: None,
            response_got: Vec::new(),
        })
    }

    /// Attach a request/response adaptor.
    pub fn with_adaptor(mut self, adaptor: Arc<dyn Adaptor>) -> Self {
        self.adaptor = Some(adaptor);
        self
    }

    /// Attach a response cache.
    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Register a callback run, in registration order, on every forwarded response.
    pub fn on_response_got<F>(&mut self, f: F)
    where
        F: Fn(&mut dyn HttpContext) + Send + Sync + 'static,
    {
        self.response_got.push(Arc::new(f));
    }

    /// The effective server pool.
    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    pub fn policy(&self) -> &Policy {
        self.balancer.policy()
    }

    /// Status codes observed per server.
    pub fn codes(&self) -> CodeSnapshot {
        self.codes.snapshot()
    }

    fn next_server(&self, ctx: &dyn HttpContext) -> &Server {
        &self.servers[self.balancer.next_index(ctx, self.servers.len())]
    }

    fn adapt_request(&self, ctx: &mut dyn HttpContext, in_place: bool) -> AdaptedRequest {
        match &self.adaptor {
            Some(adaptor) => adaptor.adapt_request(ctx, in_place),
            None => AdaptedRequest::from_context(ctx),
        }
    }

    /// Forward the request and make the backend's response the context's response.
    ///
    /// Failures are reported through the response status and tags only.
    ///
    /// After a cache miss the cache is offered the outcome exactly once, also
    /// when this future is dropped early or a callback panics.
    pub async fn handle_with_response(&self, ctx: &mut dyn HttpContext) {
        let Some(cache) = &self.cache else {
            self.forward(ctx).await;
            return;
        };
        if cache.load(ctx) {
            return;
        }

        let mut store = StoreOnDrop {
            cache: cache.clone(),
            ctx,
        };
        self.forward(&mut *store.ctx).await;
    }

    async fn forward(&self, ctx: &mut dyn HttpContext) {
        let server = self.next_server(ctx);
        ctx.add_tag(format!("backendAddr:{}", server.url));

        let adapted = self.adapt_request(ctx, true);
        let req = match build_request(&server.url, adapted, ctx) {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(server = %server.url, error = %e, "BUG: new request failed");
                ctx.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                ctx.add_tag(format!("backendBug:{e}"));
                return;
            }
        };

        let start = Instant::now();
        let resp = match self.transport.send(req).await {
            Ok(resp) => resp,
            Err(e) => {
                let e = DispatchError::from(e);
                tracing::warn!(server = %server.url, error = %e, "Backend request failed");
                metrics::record_backend_failure(&server.url, "primary");
                ctx.set_status(StatusCode::SERVICE_UNAVAILABLE);
                ctx.add_tag(format!("backendErr:{e}"));
                return;
            }
        };
        let first_byte = start.elapsed();

        let status = resp.status();
        self.codes.count(&server.url, status.as_u16());
        metrics::record_backend_response(&server.url, status.as_u16(), first_byte);

        ctx.set_status(status);
        ctx.add_tag(format!("backendCode:{}", status.as_u16()));

        let (parts, body) = resp.into_parts();
        let headers = ctx.response_headers_mut();
        for (name, value) in &parts.headers {
            headers.append(name.clone(), value.clone());
        }
        let (body, timer) = DurationBody::new(Body::new(body));
        ctx.set_body(Body::new(body));

        for f in &self.response_got {
            f(&mut *ctx);
        }

        if let Some(adaptor) = &self.adaptor {
            adaptor.adapt_response(ctx);
        }

        ctx.on_finish(Box::new(move |ctx: &mut dyn HttpContext| {
            let total = first_byte + timer.elapsed();
            ctx.add_tag(format!("backendDuration:{total:?}"));
        }));
    }

    /// Send a copy of the request to a selected server and discard the response.
    ///
    /// Never touches the context's response; failures only add a tag.
    pub async fn handle_without_response(&self, ctx: &mut dyn HttpContext) {
        let server = self.next_server(ctx);
        ctx.add_tag(format!("mirrorBackendAddr:{}", server.url));

        let adapted = self.adapt_request(ctx, false);
        let req = match build_request(&server.url, adapted, ctx) {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(server = %server.url, error = %e, "BUG: new mirror request failed");
                return;
            }
        };

        let resp = match self.transport.send(req).await {
            Ok(resp) => resp,
            Err(e) => {
                let e = DispatchError::from(e);
                tracing::debug!(server = %server.url, error = %e, "Mirror request failed");
                metrics::record_backend_failure(&server.url, "mirror");
                ctx.add_tag(format!("mirrorBackendFailed:{e}"));
                return;
            }
        };

        self.codes.count(&server.url, resp.status().as_u16());

        // The body must be read to the end for the connection to go back to the pool.
        tokio::spawn(drain(server.url.clone(), resp.into_body()));
    }
}

/// Build the outbound request: `server_url + path[?query]` with the adapted
/// method and headers and the context's body, streamed.
fn build_request(
    server_url: &str,
    adapted: AdaptedRequest,
    ctx: &mut dyn HttpContext,
) -> Result<Request<Body>, DispatchError> {
    let mut url = format!("{server_url}{}", adapted.path);
    if let Some(query) = ctx.query() {
        url.push('?');
        url.push_str(query);
    }

    let mut req = Request::builder()
        .method(adapted.method)
        .uri(&url)
        .body(Body::empty())
        .map_err(|source| DispatchError::BuildRequest { url, source })?;

    *req.headers_mut() = adapted.headers;
    // The client derives Host from the backend URL.
    req.headers_mut().remove(header::HOST);
    *req.body_mut() = ctx.take_body();

    Ok(req)
}

/// Offers the context to the cache when dropped.
struct StoreOnDrop<'a> {
    cache: Arc<dyn ResponseCache>,
    ctx: &'a mut dyn HttpContext,
}

impl Drop for StoreOnDrop<'_> {
    fn drop(&mut self) {
        self.cache.store(&mut *self.ctx);
    }
}

async fn drain(server: String, mut body: Incoming) {
    let mut bytes = 0usize;
    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => {
                if let Some(data) = frame.data_ref() {
                    bytes += data.len();
                }
            }
            Err(e) => {
                tracing::debug!(server = %server, error = %e, "Mirror response drain failed");
                return;
            }
        }
    }
    tracing::trace!(server = %server, bytes, "Mirror response drained");
}
