//! Request context over an axum request.
//!
//! # Responsibilities
//! - Expose the inbound request through `HttpContext`
//! - Collect the response status, headers and body set by the dispatcher
//! - Collect tags and run finish hooks exactly once
//!
//! # Design Decisions
//! - Finish hooks run when the response body handed to axum is dropped,
//!   i.e. after it has been streamed to the client (or the client left).
//!   A context dropped before it became a response finishes on drop.
//! - The caller IP honours X-Forwarded-For, then X-Real-Ip, then the peer

use std::mem;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::http::{request, HeaderMap, Method, Request, Response, StatusCode};
use bytes::BytesMut;
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::BodyExt;

use crate::dispatch::context::{FinishFn, HttpContext};

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Context of one inbound request and the response being built for it.
pub struct RequestContext {
    parts: request::Parts,
    body: Option<Body>,
    peer: SocketAddr,

    status: StatusCode,
    response_headers: HeaderMap,
    response_body: Option<Body>,

    tags: Vec<String>,
    finish_fns: Vec<FinishFn>,
    finished: bool,
    access_log: bool,
}

impl RequestContext {
    /// Wrap an inbound request received from `peer`.
    pub fn new(request: Request<Body>, peer: SocketAddr) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            parts,
            body: Some(body),
            peer,
            status: StatusCode::OK,
            response_headers: HeaderMap::new(),
            response_body: None,
            tags: Vec::new(),
            finish_fns: Vec::new(),
            finished: false,
            access_log: true,
        }
    }

    /// Read the request body into memory if it fits in `limit` bytes.
    ///
    /// Returns `None` when the body is larger; the context then still carries
    /// the complete body, the bytes read so far followed by the unread rest.
    /// An error means the client body could not be read.
    pub async fn buffer_body(&mut self, limit: usize) -> Result<Option<Bytes>, axum::Error> {
        let mut body = self.take_body();
        let mut buf = BytesMut::new();

        while let Some(frame) = body.frame().await {
            let Ok(data) = frame?.into_data() else {
                continue;
            };
            buf.extend_from_slice(&data);
            if buf.len() > limit {
                self.body = Some(Body::new(PrefixedBody {
                    prefix: Some(buf.freeze()),
                    inner: body,
                }));
                return Ok(None);
            }
        }

        let bytes = buf.freeze();
        self.body = Some(Body::from(bytes.clone()));
        Ok(Some(bytes))
    }

    /// A context for mirroring this request, carrying `body` as its request body.
    pub fn mirror_copy(&self, body: Bytes) -> Self {
        let mut builder = Request::builder()
            .method(self.parts.method.clone())
            .uri(self.parts.uri.clone())
            .version(self.parts.version);
        if let Some(headers) = builder.headers_mut() {
            *headers = self.parts.headers.clone();
        }
        let request = builder
            .body(Body::from(body))
            .unwrap_or_else(|_| Request::new(Body::empty()));
        let mut copy = Self::new(request, self.peer);
        copy.access_log = false;
        copy
    }

    /// Tags added so far.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Take the response body set by the dispatcher, if any.
    pub fn take_response_body(&mut self) -> Option<Body> {
        self.response_body.take()
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    /// Run the finish hooks and write the access log line, once.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        let hooks = mem::take(&mut self.finish_fns);
        for hook in hooks {
            hook(&mut *self as &mut dyn HttpContext);
        }

        if !self.access_log {
            return;
        }
        tracing::info!(
            method = %self.parts.method,
            path = %self.parts.uri.path(),
            status = self.status.as_u16(),
            client = %self.real_ip(),
            tags = %self.tags.join(" | "),
            "Request finished"
        );
    }

    /// Turn the context into the response sent to the client.
    ///
    /// Finish hooks run once the returned response body is dropped.
    pub fn into_response(mut self) -> Response<Body> {
        let body = self.response_body.take().unwrap_or_else(Body::empty);
        let status = self.status;
        let headers = mem::take(&mut self.response_headers);
        self.body = None;

        let mut response = Response::new(Body::new(FinishBody {
            inner: body,
            ctx: Some(self),
        }));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

impl HttpContext for RequestContext {
    fn method(&self) -> &Method {
        &self.parts.method
    }

    fn path(&self) -> &str {
        self.parts.uri.path()
    }

    fn query(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.parts.headers
    }

    fn real_ip(&self) -> String {
        let headers = &self.parts.headers;
        let forwarded = headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }

        let real_ip = headers
            .get(X_REAL_IP)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = real_ip {
            return ip.to_string();
        }

        self.peer.ip().to_string()
    }

    fn take_body(&mut self) -> Body {
        self.body.take().unwrap_or_else(Body::empty)
    }

    fn status(&self) -> StatusCode {
        self.status
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn response_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.response_headers
    }

    fn set_body(&mut self, body: Body) {
        self.response_body = Some(body);
    }

    fn add_tag(&mut self, tag: String) {
        self.tags.push(tag);
    }

    fn on_finish(&mut self, f: FinishFn) {
        self.finish_fns.push(f);
    }
}

impl Drop for RequestContext {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Request body whose first bytes were already read off the wire.
struct PrefixedBody {
    prefix: Option<Bytes>,
    inner: Body,
}

impl HttpBody for PrefixedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        if let Some(prefix) = self.prefix.take() {
            return Poll::Ready(Some(Ok(Frame::data(prefix))));
        }
        Pin::new(&mut self.inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.prefix.is_none() && self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        let read = self.prefix.as_ref().map_or(0, |p| p.len() as u64);
        let inner = self.inner.size_hint();
        let mut hint = SizeHint::new();
        hint.set_lower(inner.lower() + read);
        if let Some(upper) = inner.upper() {
            hint.set_upper(upper + read);
        }
        hint
    }
}

/// Response body that finishes its context when dropped.
struct FinishBody {
    inner: Body,
    ctx: Option<RequestContext>,
}

impl HttpBody for FinishBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for FinishBody {
    fn drop(&mut self) {
        if let Some(mut ctx) = self.ctx.take() {
            ctx.finish();
        }
    }
}
