use std::sync::Arc;

use crate::config::AppConfig;
use crate::mailer::Mailer;
use crate::metrics::Metrics;
use crate::middleware::rate_limit::{EndpointRateLimiter, RateLimiter};
use crate::services::tokens::TokenService;

/// Paths guarded by the per-endpoint credential limit.
pub const RATE_LIMITED_AUTH_PATHS: [&str; 5] =
    ["/signup", "/login", "/forgot-password", "/reset-password", "/resend-verification-email"];

/// The shared application state.
///
/// Everything a handler needs is reached through this struct; there are no
/// process-wide singletons. Cloning is cheap (pool handle and `Arc`s).
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool. Controllers borrow connections or open
    /// transactions from it and hand them to the service functions.
    pub db: sqlx::SqlitePool,
    pub config: Arc<AppConfig>,
    pub metrics: Metrics,
    /// Global per-IP limit applied to every request.
    pub global_limiter: RateLimiter,
    /// Tighter per-IP limits on the credential endpoints.
    pub rate_limiter: EndpointRateLimiter,
    pub tokens: TokenService,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Creates a new `AppState` with limits and token settings taken from `config`.
    pub fn new(db: sqlx::SqlitePool, config: AppConfig, mailer: Arc<dyn Mailer>) -> Self {
        let rl = &config.rate_limit;
        let rate_limiter = EndpointRateLimiter::new().with_limits(
            RATE_LIMITED_AUTH_PATHS
                .iter()
                .map(|path| (*path, rl.auth_max_requests, rl.auth_window_seconds))
                .collect(),
        );
        let global_limiter = RateLimiter::new(rl.global_max_requests, rl.global_window_seconds);
        let tokens = TokenService::new(&config.auth);

        Self {
            db,
            config: Arc::new(config),
            metrics: Metrics::new(),
            global_limiter,
            rate_limiter,
            tokens,
            mailer,
        }
    }
}
