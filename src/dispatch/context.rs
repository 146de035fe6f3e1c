//! Collaborator contracts consumed by the dispatcher.
//!
//! The dispatcher sees a request only through [`HttpContext`], and reaches
//! the optional adaptation and caching layers through [`Adaptor`] and
//! [`ResponseCache`]. None of them are implemented here beyond the concrete
//! axum-backed context in `http::context`.

use axum::body::Body;
use axum::http::{HeaderMap, Method, StatusCode};

/// Hook run once when the whole request lifecycle ends.
pub type FinishFn = Box<dyn FnOnce(&mut dyn HttpContext) + Send>;

/// Request/response context of one inbound request.
pub trait HttpContext: Send {
    /// Request method.
    fn method(&self) -> &Method;

    /// Request path, without the query string.
    fn path(&self) -> &str;

    /// Raw query string, if any.
    fn query(&self) -> Option<&str>;

    /// Request headers.
    fn headers(&self) -> &HeaderMap;

    /// Request headers, for in-place adaptation.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Resolved IP address of the caller.
    fn real_ip(&self) -> String;

    /// Take the request body stream. Later calls return an empty body.
    fn take_body(&mut self) -> Body;

    /// Current response status.
    fn status(&self) -> StatusCode;

    fn set_status(&mut self, status: StatusCode);

    /// Response headers.
    fn response_headers_mut(&mut self) -> &mut HeaderMap;

    fn set_body(&mut self, body: Body);

    /// Attach a free-form observability tag.
    fn add_tag(&mut self, tag: String);

    /// Register a hook fired once the full request lifecycle ends.
    fn on_finish(&mut self, f: FinishFn);
}

/// Method, path and headers to forward, as produced by request adaptation.
#[derive(Debug, Clone)]
pub struct AdaptedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
}

impl AdaptedRequest {
    /// The request as received, unchanged.
    pub fn from_context(ctx: &dyn HttpContext) -> Self {
        Self {
            method: ctx.method().clone(),
            path: ctx.path().to_string(),
            headers: ctx.headers().clone(),
        }
    }
}

/// Rewrites requests before forwarding and responses after.
pub trait Adaptor: Send + Sync {
    /// Produce the request to forward.
    ///
    /// With `in_place` the adaptor may also mutate the context's headers;
    /// without it the context must be left untouched.
    fn adapt_request(&self, ctx: &mut dyn HttpContext, in_place: bool) -> AdaptedRequest;

    /// Rewrite the response already set on the context.
    fn adapt_response(&self, ctx: &mut dyn HttpContext);
}

/// Response cache able to short-circuit dispatch.
pub trait ResponseCache: Send + Sync {
    /// Serve the request from cache. On `true` the response is already populated.
    fn load(&self, ctx: &mut dyn HttpContext) -> bool;

    /// Offer the outcome of a dispatch to the cache.
    fn store(&self, ctx: &mut dyn HttpContext);
}
