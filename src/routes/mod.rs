//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router carries the JSON auth API and the health check, falls back
//! to static presentation assets for everything else, and runs every request
//! through the edge route gate before any of that.

pub mod auth;

use std::path::Path;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::gate::edge_gate;
use crate::state::AppState;

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/sign-up", post(auth::sign_up))
        .route("/api/auth/sign-in", post(auth::sign_in))
        .route("/api/auth/google", post(auth::google))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/username-available", get(auth::username_available))
        .route("/api/auth/username", post(auth::set_username))
        .route("/api/auth/password-reset", post(auth::password_reset))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/state", get(auth::auth_state))
        .route("/healthz", get(healthz))
}

/// Full application router: API, static fallback from `static_dir`, edge
/// gate, request tracing.
pub fn app(state: AppState, static_dir: &Path) -> Router {
    let assets = ServeDir::new(static_dir).append_index_html_on_directories(true);
    api_routes()
        .fallback_service(assets)
        .layer(middleware::from_fn_with_state(state.clone(), edge_gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
