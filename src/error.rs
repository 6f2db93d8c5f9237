use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// The primary error type for the application.
///
/// Services, controllers and extractors all return this type; its
/// [`IntoResponse`] impl is the single place where failures become HTTP.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// For internal server errors that are not expected to be handled by the client.
    #[error("Internal error: {0}")]
    Internal(anyhow::Error),
    /// For client errors due to invalid requests.
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// For when a requested resource is not found.
    #[error("Not found: {0}")]
    NotFound(String),
    /// For when a request conflicts with the current state of the server.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Missing, malformed or revoked credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// Valid credentials, but the account may not perform the action yet.
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Rate limited. Retry after {retry_after_seconds} seconds")]
    RateLimited {
        /// The number of seconds to wait before retrying the request.
        retry_after_seconds: u64,
    },
    /// For when a specific field in a request fails validation.
    #[error("Validation error on field '{field}': {message}")]
    ValidationError {
        /// The name of the field that failed validation.
        field: String,
        /// A message describing the validation error.
        message: String,
    },
    /// Outgoing email could not be built or delivered.
    #[error("Mail error: {0}")]
    Mail(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message, details) = match self {
            AppError::Internal(e) => {
                let error_id = uuid::Uuid::new_v4();
                tracing::error!(%error_id, "Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    Some(json!({ "error_id": error_id.to_string() })),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg, None),
            AppError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg, None)
            }
            AppError::Database(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                    None,
                )
            }
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg, None),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg, None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg, None),
            AppError::RateLimited { retry_after_seconds } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("Too many requests. Please retry after {} seconds", retry_after_seconds),
                Some(json!({ "retry_after_seconds": retry_after_seconds })),
            ),
            AppError::ValidationError { field, message } => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format!("Validation failed for field '{}'", field),
                Some(json!({ "field": field, "message": message })),
            ),
            AppError::Mail(msg) => {
                tracing::error!("Mail error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "MAIL_ERROR",
                    "Email could not be sent".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({
            "error": {
                "code": error_code,
                "message": error_message,
            },
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        if let Some(details) = details {
            body["error"]["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    AppError::Conflict("Record already exists".to_string())
                } else if db_err.is_foreign_key_violation() {
                    AppError::BadRequest("Referenced record does not exist".to_string())
                } else {
                    AppError::Database(db_err.message().to_string())
                }
            }
            sqlx::Error::PoolTimedOut => {
                AppError::ServiceUnavailable("Database connection pool timed out".to_string())
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

// Extractor rejections become 400s with the JSON error body.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::Internal(anyhow::anyhow!("password hashing failed: {}", err))
    }
}

/// A type alias for `Result<T, AppError>`, used throughout the application.
pub type AppResult<T> = Result<T, AppError>;

/// An extension trait for `Option` that provides a convenient way to convert
/// an `Option` to a `Result` with a `NotFound` error.
pub trait OptionExt<T> {
    /// Converts `None` into `AppError::NotFound("<entity> not found")`.
    fn ok_or_not_found(self, entity: &str) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &str) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(format!("{} not found", entity)))
    }
}

/// Field-level checks shared by the request DTOs.
pub mod validation {
    use super::*;

    fn invalid(field: &str, message: impl Into<String>) -> AppError {
        AppError::ValidationError { field: field.to_string(), message: message.into() }
    }

    /// Checks that `value` is non-blank and at most `max` characters long.
    pub fn validate_text(value: &str, field: &str, max: usize) -> AppResult<()> {
        if value.trim().is_empty() {
            return Err(invalid(field, "must not be empty"));
        }
        if value.chars().count() > max {
            return Err(invalid(field, format!("must be at most {} characters", max)));
        }
        if value.contains('\0') {
            return Err(invalid(field, "contains null characters"));
        }
        Ok(())
    }

    /// Accepts `local@domain.tld` shaped addresses.
    pub fn validate_email(email: &str) -> AppResult<()> {
        let email = email.trim();
        if email.len() > 254 || email.chars().any(char::is_whitespace) {
            return Err(invalid("email", "is not a valid email address"));
        }
        let Some((local, domain)) = email.split_once('@') else {
            return Err(invalid("email", "is not a valid email address"));
        };
        let domain_ok = domain
            .split_once('.')
            .map(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
            .unwrap_or(false);
        if local.is_empty() || domain.contains('@') || !domain_ok {
            return Err(invalid("email", "is not a valid email address"));
        }
        Ok(())
    }

    pub fn validate_password(password: &str) -> AppResult<()> {
        let len = password.chars().count();
        if len < 8 {
            return Err(invalid("password", "must be at least 8 characters"));
        }
        // bcrypt only looks at the first 72 bytes
        if password.len() > 72 {
            return Err(invalid("password", "must be at most 72 bytes"));
        }
        Ok(())
    }

    /// Checks that an optional number is positive.
    pub fn validate_positive_number(value: Option<i64>, field: &str) -> AppResult<()> {
        if let Some(v) = value {
            if v <= 0 {
                return Err(invalid(field, format!("Value must be positive, got {}", v)));
            }
        }
        Ok(())
    }
}
