//! # Book Exchange Backend Library
//!
//! REST backend for a book exchange: user accounts with email verification
//! and password reset, plus a per-user activity log.
//!
//! ## Architecture
//!
//! Requests flow `routes` → `controllers` → `services` → SQLite:
//! - **Axum**: HTTP server, routing and extractors
//! - **SQLx**: asynchronous SQLite access; service functions take the
//!   connection (or open transaction) they run on
//! - **Tokio**: async runtime
//! - **Serde**: JSON request/response bodies
//!
//! ## Core Components
//!
//! - [`config`]: layered configuration (embedded defaults, file, environment)
//! - [`db`]: schema initialization
//! - [`error`]: application error type and its HTTP mapping
//! - [`extract`]: body, path and query extractors rejecting with [`error::AppError`]
//! - [`mailer`]: outgoing email (SMTP, log, in-memory)
//! - [`metrics`]: activity counters
//! - [`middleware`]: bearer auth, client IP, rate limiting, security headers
//! - [`controllers`]: request handlers
//! - [`routes`]: route tables and router assembly
//! - [`services`]: per-entity data access and token handling
//! - [`state`]: shared application state
//! - [`types`]: rows, request DTOs and responses

pub mod config;
pub mod controllers;
pub mod db;
pub mod error;
pub mod extract;
pub mod mailer;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;
