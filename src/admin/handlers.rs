use axum::{extract::State, Json};
use serde::Serialize;

use crate::dispatch::Dispatcher;
use crate::http::server::AppState;
use crate::observability::codes::CodeSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct ServerView {
    pub url: String,
    pub tags: Vec<String>,
}

#[derive(Serialize)]
pub struct BackendView {
    pub policy: &'static str,
    pub servers: Vec<ServerView>,
}

impl From<&Dispatcher> for BackendView {
    fn from(dispatcher: &Dispatcher) -> Self {
        Self {
            policy: dispatcher.policy().name(),
            servers: dispatcher
                .servers()
                .iter()
                .map(|s| ServerView {
                    url: s.url.clone(),
                    tags: s.tags.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
pub struct Backends {
    pub primary: BackendView,
    pub mirror: Option<BackendView>,
}

#[derive(Serialize)]
pub struct Codes {
    pub primary: CodeSnapshot,
    pub mirror: Option<CodeSnapshot>,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_servers(State(state): State<AppState>) -> Json<Backends> {
    let dispatchers = state.dispatchers.load();
    Json(Backends {
        primary: BackendView::from(dispatchers.primary.as_ref()),
        mirror: dispatchers.mirror.as_deref().map(BackendView::from),
    })
}

pub async fn get_codes(State(state): State<AppState>) -> Json<Codes> {
    let dispatchers = state.dispatchers.load();
    Json(Codes {
        primary: dispatchers.primary.codes(),
        mirror: dispatchers.mirror.as_ref().map(|m| m.codes()),
    })
}
