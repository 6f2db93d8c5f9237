//! Cross-cutting HTTP concerns: caller authentication, client IP detection,
//! rate limiting and response hardening headers.

pub mod auth;
pub mod ip;
pub mod rate_limit;
pub mod security_headers;

pub use auth::AuthUser;
pub use rate_limit::{EndpointRateLimiter, RateLimiter};
