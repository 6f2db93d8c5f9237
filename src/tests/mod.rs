//! Integration tests for the Book Exchange backend.
//!
//! HTTP tests drive the real router in-process with `tower::ServiceExt::oneshot`
//! against an in-memory SQLite database and a [`MemoryMailer`], so tokens sent
//! by email can be read back.
//!
//! ## Test Modules
//!
//! - **logs_service_tests**: service functions and transaction composition
//! - **sessions_service_tests**: session lookup and expiry purging
//! - **auth_api_tests**: the account route table and its flows
//! - **logs_api_tests**: activity log endpoints
//! - **health_api_tests**: liveness, readiness, metrics and headers
//! - **config_tests**: configuration loading and validation
//! - **error_tests**: error to HTTP mapping

pub mod health_api_tests;
pub mod logs_service_tests;
pub mod sessions_service_tests;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::mailer::{extract_token, MemoryMailer};
use crate::routes::build_router;
use crate::state::AppState;

pub(crate) const PASSWORD: &str = "correct horse battery";

/// Defaults with the cheapest bcrypt cost.
pub(crate) fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.bcrypt_cost = 4;
    config
}

/// One connection that never expires, so the in-memory database lives for the whole test.
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    crate::db::init_db(&pool).await.unwrap();
    pool
}

pub(crate) struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub mailer: MemoryMailer,
}

pub(crate) async fn test_app() -> TestApp {
    test_app_with(test_config()).await
}

pub(crate) async fn test_app_with(config: AppConfig) -> TestApp {
    let mailer = MemoryMailer::new();
    let state = AppState::new(test_pool().await, config, Arc::new(mailer.clone()));
    TestApp { router: build_router(state.clone()), state, mailer }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(req).await
    }

    /// Sends a prebuilt request; the body is parsed as JSON when possible.
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body), None).await
    }

    pub async fn signup(&self, email: &str) -> (StatusCode, Value) {
        self.post("/signup", json!({ "name": "Reader", "email": email, "password": PASSWORD })).await
    }

    /// Token from the latest email sent to `email`.
    pub fn mailed_token(&self, email: &str) -> String {
        let sent = self.mailer.last_to(email).expect("no email sent to address");
        extract_token(&sent.body).expect("email carries no token")
    }

    /// Signs up and verifies `email`, returning the new user's id.
    pub async fn verified_user(&self, email: &str) -> i64 {
        let (status, body) = self.signup(email).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let token = self.mailed_token(email);
        let (status, body) = self.post("/verify-email", json!({ "token": token })).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["user"]["id"].as_i64().unwrap()
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.post("/login", json!({ "email": email, "password": password })).await
    }

    pub async fn access_token(&self, email: &str) -> String {
        let (status, body) = self.login(email, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["access_token"].as_str().unwrap().to_string()
    }
}
