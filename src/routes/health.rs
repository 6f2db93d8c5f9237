use std::time::Duration;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/metrics/prometheus", get(metrics_prometheus))
        .route("/version", get(version))
}

/// Liveness; touches nothing.
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

const READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Readiness: the database answers `SELECT 1` within [`READY_TIMEOUT`].
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let ping = sqlx::query("SELECT 1").execute(&state.db);
    let failure = match tokio::time::timeout(READY_TIMEOUT, ping).await {
        Ok(Ok(_)) => return (StatusCode::OK, "ready".to_string()),
        Ok(Err(e)) => e.to_string(),
        Err(_) => "database ping timed out".to_string(),
    };
    tracing::warn!("readiness check failed: {}", failure);
    (StatusCode::SERVICE_UNAVAILABLE, format!("not ready: {}", failure))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.get_snapshot())
}

/// Counters in the Prometheus text exposition format.
pub async fn metrics_prometheus(State(state): State<AppState>) -> impl IntoResponse {
    let m = state.metrics.get_snapshot();
    let counters = [
        ("signups", "Accounts created", m.signups),
        ("logins_succeeded", "Successful logins", m.logins_succeeded),
        ("logins_failed", "Rejected logins", m.logins_failed),
        ("emails_sent", "Emails handed to the mailer", m.emails_sent),
        ("emails_failed", "Emails the mailer rejected", m.emails_failed),
        ("logs_written", "Activity log entries written", m.logs_written),
    ];
    let mut body = String::new();
    for (name, help, value) in counters {
        body.push_str(&format!(
            "# HELP book_exchange_{name} {help}\n# TYPE book_exchange_{name} counter\nbook_exchange_{name} {value}\n"
        ));
    }
    body.push_str(&format!(
        "# HELP book_exchange_uptime_seconds Uptime seconds\n# TYPE book_exchange_uptime_seconds gauge\nbook_exchange_uptime_seconds {}\n",
        m.uptime_seconds
    ));
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

pub async fn version() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "profile": if cfg!(debug_assertions) { "debug" } else { "release" },
    }))
}
