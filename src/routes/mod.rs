//! HTTP route tables.
//!
//! - `auth`: account lifecycle (signup, login, logout, verification, password reset)
//! - `logs`: activity log CRUD for the signed-in user
//! - `health`: liveness, readiness, metrics and version
//!
//! [`build_router`] merges them and installs the middleware stack; `main` and
//! the HTTP tests share it.

pub mod auth;
pub mod health;
pub mod logs;

use axum::{extract::DefaultBodyLimit, middleware::from_fn_with_state, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::AppError;
use crate::middleware::{rate_limit::rate_limit_middleware, security_headers::security_headers_middleware};
use crate::state::AppState;

/// Request bodies are small JSON documents.
const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let app = Router::new()
        .merge(auth::router())
        .merge(logs::router())
        .merge(health::router())
        .fallback(fallback)
        .with_state(state.clone())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(from_fn_with_state(state, rate_limit_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(config, security_headers_middleware));

    // CORS: permissive in debug builds for a separately served frontend
    if cfg!(debug_assertions) {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

async fn fallback() -> AppError {
    AppError::NotFound("No such route".to_string())
}
