//! Admin API: status, effective servers and status code export.
//!
//! Counters belong to the dispatchers of the current configuration
//! generation, so they restart from zero after a reload.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/servers", get(get_servers))
        .route("/admin/codes", get(get_codes))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
