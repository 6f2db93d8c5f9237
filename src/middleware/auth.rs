use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::error::AppError;
use crate::services::sessions;
use crate::state::AppState;

/// The caller behind a valid `Authorization: Bearer <token>` header.
///
/// Extraction checks the JWT signature and expiry, then confirms the session
/// row still exists, so logged-out tokens are rejected even before they expire.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub session_id: String,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;
        let claims = state.tokens.decode_access_token(token)?;

        let now = chrono::Utc::now().timestamp();
        let mut conn = state.db.acquire().await?;
        let session = sessions::find_active_session(&mut conn, &claims.sid, now)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Session has ended".to_string()))?;

        if session.user_id != claims.sub {
            tracing::warn!(session_id = %session.id, "token subject does not match session owner");
            return Err(AppError::Unauthorized("Invalid token".to_string()));
        }

        Ok(AuthUser { user_id: claims.sub, email: claims.email, session_id: session.id })
    }
}
