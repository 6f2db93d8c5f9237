use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{
    validation::{validate_email, validate_password, validate_positive_number, validate_text},
    AppError, AppResult,
};

pub const MAX_ACTION_LEN: usize = 64;
pub const MAX_MESSAGE_LEN: usize = 2000;
pub const MAX_DETAILS_LEN: usize = 10_000;
pub const MAX_NAME_LEN: usize = 100;

pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 200;

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Log {
    pub id: i64,
    pub user_id: Option<i64>,
    pub level: LogLevel,
    pub action: String,
    pub message: String,
    pub details: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateLogRequest {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub level: LogLevel,
    pub action: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
}

impl CreateLogRequest {
    /// Shorthand for the entries controllers append on auth events.
    pub fn event(user_id: Option<i64>, level: LogLevel, action: &str, message: impl Into<String>) -> Self {
        Self { user_id, level, action: action.to_string(), message: message.into(), details: None }
    }

    pub fn validate(&self) -> AppResult<()> {
        validate_positive_number(self.user_id, "user_id")?;
        validate_text(&self.action, "action", MAX_ACTION_LEN)?;
        validate_text(&self.message, "message", MAX_MESSAGE_LEN)?;
        if let Some(details) = &self.details {
            validate_text(details, "details", MAX_DETAILS_LEN)?;
        }
        Ok(())
    }
}

/// Maps a present field to `Some(value)`, so an explicit `null` is `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update: absent fields keep their stored value.
///
/// `details` distinguishes absent (`None`, kept) from an explicit `null`
/// (`Some(None)`, cleared). The other fields are required columns and
/// cannot be cleared.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateLogRequest {
    #[serde(default)]
    pub level: Option<LogLevel>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub details: Option<Option<String>>,
}

impl UpdateLogRequest {
    pub fn is_empty(&self) -> bool {
        self.level.is_none() && self.action.is_none() && self.message.is_none() && self.details.is_none()
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.is_empty() {
            return Err(AppError::BadRequest("update must set at least one field".into()));
        }
        if let Some(action) = &self.action {
            validate_text(action, "action", MAX_ACTION_LEN)?;
        }
        if let Some(message) = &self.message {
            validate_text(message, "message", MAX_MESSAGE_LEN)?;
        }
        if let Some(Some(details)) = &self.details {
            validate_text(details, "details", MAX_DETAILS_LEN)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListLogsQuery {
    pub user_id: Option<i64>,
    pub level: Option<LogLevel>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListLogsQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

// ---------------------------------------------------------------------------
// Users and sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub email_verified: bool,
    pub verification_token: Option<String>,
    pub verification_expires_at: Option<i64>,
    pub reset_token: Option<String>,
    pub reset_expires_at: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// What the API returns for a user; never includes hashes or tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    pub created_at: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            email_verified: user.email_verified,
            created_at: user.created_at.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub created_at: String,
    pub expires_at: i64,
}

/// Normalised form used for storage and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_text(&self.name, "name", MAX_NAME_LEN)?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: PublicUser,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
