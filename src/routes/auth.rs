//! Account routes. Every path accepts POST only; axum answers other methods
//! with 405.

use axum::{routing::post, Router};

use crate::controllers::auth::{
    handle_authenticate, handle_forgot_password, handle_logout, handle_register, handle_resend_email,
    handle_reset_password, handle_verify_email,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(handle_register))
        .route("/login", post(handle_authenticate))
        .route("/logout", post(handle_logout))
        .route("/forgot-password", post(handle_forgot_password))
        .route("/reset-password", post(handle_reset_password))
        .route("/verify-email", post(handle_verify_email))
        .route("/resend-verification-email", post(handle_resend_email))
}
