//! Security headers middleware for HTTP responses.
//!
//! Every response is a JSON API response, so all of them get the same
//! hardening headers and a `no-store` caching policy. HSTS and CSP are opt-in
//! through the `[security]` config section.

use axum::{
    extract::{Request, State},
    http::{
        header::{CACHE_CONTROL, PRAGMA},
        HeaderMap, HeaderName, HeaderValue,
    },
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::config::{AppConfig, SecurityConfig};

const DEFAULT_HSTS_MAX_AGE: u64 = 31_536_000;

const HARDENING_HEADERS: [(&str, &str); 6] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "no-referrer"),
    ("permissions-policy", "geolocation=(), microphone=(), camera=()"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
];

fn hsts_value(sec: &SecurityConfig) -> Option<HeaderValue> {
    if !sec.enable_hsts.unwrap_or(false) {
        return None;
    }
    let mut value = format!("max-age={}", sec.hsts_max_age.unwrap_or(DEFAULT_HSTS_MAX_AGE));
    if sec.hsts_include_subdomains.unwrap_or(false) {
        value.push_str("; includeSubDomains");
    }
    HeaderValue::from_str(&value).ok()
}

fn apply_optional(headers: &mut HeaderMap, sec: &SecurityConfig) {
    if let Some(hsts) = hsts_value(sec) {
        headers.insert(HeaderName::from_static("strict-transport-security"), hsts);
    }
    let Some(csp) = sec.csp.as_deref().map(str::trim).filter(|c| !c.is_empty()) else {
        return;
    };
    match HeaderValue::from_str(csp) {
        Ok(val) => {
            headers.insert(HeaderName::from_static("content-security-policy"), val);
        }
        Err(e) => tracing::warn!("Ignoring invalid security.csp value: {}", e),
    }
}

pub async fn security_headers_middleware(
    State(cfg): State<Arc<AppConfig>>,
    req: Request,
    next: Next,
) -> Response {
    let mut res = next.run(req).await;
    let headers = res.headers_mut();

    for (name, value) in HARDENING_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    if let Some(sec) = cfg.security.as_ref() {
        apply_optional(headers, sec);
    }

    // Tokens and account data must never be cached
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

    res
}
