//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use http_backend::admin::setup_admin_router;
use http_backend::config::loader::parse_config;
use http_backend::config::{
    BackendSpec, GatewayConfig, LoadBalanceConfig, ServerConfig, TransportConfig,
};
use http_backend::http::{AppState, HttpServer, RequestContext};
use http_backend::{Shutdown, Transport};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// What a mock backend saw of one request.
#[derive(Debug, Clone)]
pub struct Received {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Received {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A running mock backend.
pub struct MockBackend {
    pub addr: SocketAddr,
    pub url: String,
    connections: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<Received>>>,
}

impl MockBackend {
    /// TCP connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Requests fully read so far.
    pub fn requests(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    /// Wait until at least `n` requests arrived, or give up after a second.
    pub async fn wait_for_requests(&self, n: usize) -> bool {
        for _ in 0..100 {
            if self.request_count() >= n {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

/// Start a keep-alive HTTP/1.1 mock backend answering every request with `f`.
pub async fn start_backend<F>(f: F) -> MockBackend
where
    F: Fn(&Received) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let received = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let conns = connections.clone();
    let recv = received.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            conns.fetch_add(1, Ordering::SeqCst);
            let f = f.clone();
            let recv = recv.clone();
            tokio::spawn(async move {
                let _ = serve_connection(socket, f, recv).await;
            });
        }
    });

    MockBackend {
        addr,
        url: format!("http://{}", addr),
        connections,
        received,
    }
}

/// Start a mock backend that always answers 200 with `body`.
pub async fn start_named_backend(body: &'static str) -> MockBackend {
    start_backend(move |_| (200, body.to_string())).await
}

async fn serve_connection<F>(
    mut socket: TcpStream,
    f: Arc<F>,
    received: Arc<Mutex<Vec<Received>>>,
) -> std::io::Result<()>
where
    F: Fn(&Received) -> (u16, String),
{
    let mut buf = Vec::new();
    loop {
        let head_end = loop {
            if let Some(pos) = find(&buf, b"\r\n\r\n") {
                break pos + 4;
            }
            if read_more(&mut socket, &mut buf).await? == 0 {
                return Ok(());
            }
        };

        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
        let mut lines = head.split("\r\n");
        let mut request_line = lines.next().unwrap_or_default().split(' ');
        let method = request_line.next().unwrap_or_default().to_string();
        let target = request_line.next().unwrap_or_default().to_string();
        let headers: Vec<(String, String)> = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
            .collect();
        let content_length = headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(0);

        while buf.len() < head_end + content_length {
            if read_more(&mut socket, &mut buf).await? == 0 {
                return Ok(());
            }
        }
        let body = buf[head_end..head_end + content_length].to_vec();
        buf.drain(..head_end + content_length);

        let request = Received {
            method,
            target,
            headers,
            body,
        };
        let (status, body) = f(&request);
        received.lock().unwrap().push(request);

        let response = format!(
            "HTTP/1.1 {} Mock\r\nContent-Length: {}\r\nX-Mock-Backend: yes\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await?;
    }
}

async fn read_more(socket: &mut TcpStream, buf: &mut Vec<u8>) -> std::io::Result<usize> {
    let mut chunk = [0u8; 4096];
    let n = socket.read(&mut chunk).await?;
    buf.extend_from_slice(&chunk[..n]);
    Ok(n)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// A backend that accepts connections and reads requests but never answers.
pub async fn start_silent_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                while matches!(socket.read(&mut buf).await, Ok(n) if n > 0) {}
            });
        }
    });
    format!("http://{}", addr)
}

/// A URL nothing listens on.
pub async fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn transport() -> Transport {
    Transport::new(&TransportConfig::default()).unwrap()
}

pub fn spec(servers: &[(&str, &[&str])], filter: &[&str], policy: &str) -> BackendSpec {
    BackendSpec {
        servers_tags: filter.iter().map(|t| t.to_string()).collect(),
        servers: servers
            .iter()
            .map(|(url, tags)| ServerConfig {
                url: url.to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            })
            .collect(),
        load_balance: LoadBalanceConfig {
            policy: policy.to_string(),
            header_hash_key: None,
        },
    }
}

/// Backend spec over untagged servers.
pub fn simple_spec<S: AsRef<str>>(urls: &[S], policy: &str) -> BackendSpec {
    let servers: Vec<(&str, &[&str])> = urls.iter().map(|u| (u.as_ref(), &[][..])).collect();
    spec(&servers, &[], policy)
}

pub fn ctx(method: &str, uri: &str, headers: &[(&str, &str)], body: &'static str) -> RequestContext {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let peer: SocketAddr = "10.0.0.1:40000".parse().unwrap();
    RequestContext::new(builder.body(Body::from(body)).unwrap(), peer)
}

/// Read the response body the dispatcher set on `ctx`.
pub async fn response_text(ctx: &mut RequestContext) -> String {
    use http_body_util::BodyExt;
    match ctx.take_response_body() {
        Some(body) => {
            let bytes = body.collect().await.unwrap().to_bytes();
            String::from_utf8(bytes.to_vec()).unwrap()
        }
        None => String::new(),
    }
}

/// TOML for a gateway over `primary`, optionally mirroring to `mirror`.
pub fn gateway_toml<S: AsRef<str>>(
    primary: &[S],
    mirror: Option<&[S]>,
    mirror_body_limit: usize,
) -> String {
    fn servers<S: AsRef<str>>(urls: &[S]) -> String {
        let list: Vec<String> = urls
            .iter()
            .map(|u| format!("{{ url = \"{}\" }}", u.as_ref()))
            .collect();
        format!("servers = [{}]", list.join(", "))
    }

    let mut toml = format!(
        "[listener]\nbind_address = \"127.0.0.1:0\"\nmirror_body_limit = {mirror_body_limit}\n\n\
         [backend]\n{}\n\n[backend.load_balance]\npolicy = \"roundRobin\"\n\n",
        servers(primary)
    );
    if let Some(mirror) = mirror {
        toml.push_str(&format!("[mirror]\n{}\n\n", servers(mirror)));
    }
    toml.push_str("[admin]\napi_key = \"test-key\"\n");
    toml
}

pub fn gateway_config<S: AsRef<str>>(primary: &[S], mirror: Option<&[S]>) -> GatewayConfig {
    parse_config(&gateway_toml(primary, mirror, 4 * 1024 * 1024)).unwrap()
}

/// A gateway running in the background.
pub struct Gateway {
    pub url: String,
    pub state: AppState,
    pub shutdown: Shutdown,
    pub updates: mpsc::UnboundedSender<GatewayConfig>,
}

pub async fn start_gateway(config: GatewayConfig) -> Gateway {
    let server = HttpServer::new(&config, transport()).unwrap();
    let state = server.state();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    Gateway {
        url: format!("http://{}", addr),
        state,
        shutdown,
        updates,
    }
}

/// Serve the admin API for `state`, returning its base URL.
pub async fn start_admin(state: AppState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, setup_admin_router(state)).await;
    });
    format!("http://{}", addr)
}
