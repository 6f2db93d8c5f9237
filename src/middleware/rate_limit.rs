use super::ip::resolve_client_ip;
use axum::{
    extract::{connect_info::ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::state::AppState;

/// A thread-safe rate limiter based on the sliding window algorithm.
#[derive(Clone)]
pub struct RateLimiter {
    requests: Arc<RwLock<HashMap<IpAddr, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    /// Allows `max_requests` per IP within any `window_seconds` span.
    pub fn new(max_requests: usize, window_seconds: u64) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_seconds),
        }
    }

    /// Records the request and returns `Ok(())`, or `AppError::RateLimited`
    /// when `ip` has used up its window.
    pub async fn check_rate_limit(&self, ip: IpAddr) -> Result<(), AppError> {
        let now = Instant::now();
        let mut requests = self.requests.write().await;

        let timestamps = requests.entry(ip).or_default();

        // On clock skew keep the timestamp
        timestamps.retain(|&t| now.checked_duration_since(t).map(|d| d < self.window).unwrap_or(true));

        if timestamps.len() >= self.max_requests {
            let oldest = timestamps.first().copied().unwrap_or(now);
            let retry_after = match now.checked_duration_since(oldest) {
                Some(elapsed) => self.window.saturating_sub(elapsed),
                None => Duration::from_secs(1),
            };
            return Err(AppError::RateLimited { retry_after_seconds: retry_after.as_secs().max(1) });
        }

        timestamps.push(now);
        Ok(())
    }

    /// Drops IPs with no requests inside the current window.
    pub async fn cleanup_old_entries(&self) {
        let now = Instant::now();
        let mut requests = self.requests.write().await;

        requests.retain(|_, timestamps| {
            timestamps.retain(|&t| now.checked_duration_since(t).map(|d| d < self.window).unwrap_or(true));
            !timestamps.is_empty()
        });
    }

    pub async fn tracked_ips(&self) -> usize {
        self.requests.read().await.len()
    }
}

/// Global per-IP limit (`state.global_limiter`), installed with `from_fn_with_state`.
pub async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let remote_ip = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|info| info.0.ip());
    let ip = resolve_client_ip(req.headers(), remote_ip, state.config.server.trust_proxy);

    match state.global_limiter.check_rate_limit(ip).await {
        Ok(()) => next.run(req).await,
        Err(e) => e.into_response(),
    }
}

/// A manager for per-endpoint rate limiters.
#[derive(Clone, Default)]
pub struct EndpointRateLimiter {
    limiters: Arc<HashMap<String, RateLimiter>>,
}

impl EndpointRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces limits, given as `(path, max_requests, window_seconds)`.
    pub fn with_limits(self, limits: Vec<(&str, usize, u64)>) -> Self {
        let mut limiters_map = Arc::try_unwrap(self.limiters).unwrap_or_else(|arc| (*arc).clone());
        for (endpoint, max_requests, window_seconds) in limits {
            limiters_map.insert(endpoint.to_string(), RateLimiter::new(max_requests, window_seconds));
        }
        Self { limiters: Arc::new(limiters_map) }
    }

    /// Paths without a configured limit always pass.
    pub async fn check_endpoint_limit(&self, endpoint: &str, ip: IpAddr) -> Result<(), AppError> {
        match self.limiters.get(endpoint) {
            Some(limiter) => limiter.check_rate_limit(ip).await,
            None => Ok(()),
        }
    }

    pub async fn cleanup_all(&self) {
        for limiter in self.limiters.values() {
            limiter.cleanup_old_entries().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter() {
        let limiter = RateLimiter::new(3, 1);
        let ip = IpAddr::from([127, 0, 0, 1]);

        assert!(limiter.check_rate_limit(ip).await.is_ok());
        assert!(limiter.check_rate_limit(ip).await.is_ok());
        assert!(limiter.check_rate_limit(ip).await.is_ok());

        // 4th request should fail
        assert!(matches!(limiter.check_rate_limit(ip).await, Err(AppError::RateLimited { .. })));

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(limiter.check_rate_limit(ip).await.is_ok());
    }

    #[tokio::test]
    async fn test_different_ips() {
        let limiter = RateLimiter::new(1, 1);
        let ip1 = IpAddr::from([127, 0, 0, 1]);
        let ip2 = IpAddr::from([127, 0, 0, 2]);

        assert!(limiter.check_rate_limit(ip1).await.is_ok());
        assert!(limiter.check_rate_limit(ip2).await.is_ok());

        assert!(limiter.check_rate_limit(ip1).await.is_err());
        assert!(limiter.check_rate_limit(ip2).await.is_err());
    }

    #[tokio::test]
    async fn test_cleanup_drops_idle_ips() {
        let limiter = RateLimiter::new(5, 1);
        limiter.check_rate_limit(IpAddr::from([10, 0, 0, 1])).await.unwrap();
        assert_eq!(limiter.tracked_ips().await, 1);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        limiter.cleanup_old_entries().await;
        assert_eq!(limiter.tracked_ips().await, 0);
    }

    #[tokio::test]
    async fn test_endpoint_limits_are_per_path() {
        let limiter = EndpointRateLimiter::new().with_limits(vec![("/login", 1, 60)]);
        let ip = IpAddr::from([127, 0, 0, 1]);

        assert!(limiter.check_endpoint_limit("/login", ip).await.is_ok());
        assert!(limiter.check_endpoint_limit("/login", ip).await.is_err());
        // unconfigured path
        assert!(limiter.check_endpoint_limit("/logout", ip).await.is_ok());
    }
}
