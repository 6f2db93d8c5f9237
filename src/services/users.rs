//! User account persistence: credentials plus verification/reset token state.

use sqlx::SqliteConnection;

use crate::error::{AppError, AppResult, OptionExt};
use crate::types::User;

const USER_COLUMNS: &str = "id, name, email, password_hash, email_verified, verification_token, \
     verification_expires_at, reset_token, reset_expires_at, created_at, updated_at";

pub struct NewUser<'a> {
    pub name: &'a str,
    /// Already normalised with [`crate::types::normalize_email`].
    pub email: &'a str,
    pub password_hash: &'a str,
    pub verification_token: &'a str,
    pub verification_expires_at: i64,
}

pub async fn create_user(conn: &mut SqliteConnection, data: &NewUser<'_>) -> AppResult<User> {
    let sql = format!(
        r#"INSERT INTO users (name, email, password_hash, verification_token, verification_expires_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           RETURNING {}"#,
        USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&sql)
        .bind(data.name.trim())
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.verification_token)
        .bind(data.verification_expires_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("An account with this email already exists".into()),
            other => other,
        })
}

pub async fn find_by_email(conn: &mut SqliteConnection, email: &str) -> AppResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS);
    Ok(sqlx::query_as::<_, User>(&sql).bind(email).fetch_optional(&mut *conn).await?)
}

/// Matches only tokens whose expiry is after `now` (unix seconds).
pub async fn find_by_verification_token(
    conn: &mut SqliteConnection,
    token: &str,
    now: i64,
) -> AppResult<Option<User>> {
    let sql = format!(
        "SELECT {} FROM users WHERE verification_token = ?1 AND verification_expires_at > ?2",
        USER_COLUMNS
    );
    Ok(sqlx::query_as::<_, User>(&sql).bind(token).bind(now).fetch_optional(&mut *conn).await?)
}

/// Matches only tokens whose expiry is after `now` (unix seconds).
pub async fn find_by_reset_token(conn: &mut SqliteConnection, token: &str, now: i64) -> AppResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE reset_token = ?1 AND reset_expires_at > ?2", USER_COLUMNS);
    Ok(sqlx::query_as::<_, User>(&sql).bind(token).bind(now).fetch_optional(&mut *conn).await?)
}

pub async fn set_verification_token(
    conn: &mut SqliteConnection,
    id: i64,
    token: &str,
    expires_at: i64,
) -> AppResult<User> {
    let sql = format!(
        r#"UPDATE users SET verification_token = ?1, verification_expires_at = ?2,
               updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now')
           WHERE id = ?3 RETURNING {}"#,
        USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&sql)
        .bind(token)
        .bind(expires_at)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_not_found("User")
}

/// Marks the address verified and clears the verification token.
pub async fn mark_email_verified(conn: &mut SqliteConnection, id: i64) -> AppResult<User> {
    let sql = format!(
        r#"UPDATE users SET email_verified = 1, verification_token = NULL, verification_expires_at = NULL,
               updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now')
           WHERE id = ?1 RETURNING {}"#,
        USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&mut *conn).await?.ok_or_not_found("User")
}

pub async fn set_reset_token(conn: &mut SqliteConnection, id: i64, token: &str, expires_at: i64) -> AppResult<User> {
    let sql = format!(
        r#"UPDATE users SET reset_token = ?1, reset_expires_at = ?2,
               updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now')
           WHERE id = ?3 RETURNING {}"#,
        USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&sql)
        .bind(token)
        .bind(expires_at)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_not_found("User")
}

/// Stores a new hash and clears any outstanding reset token.
pub async fn update_password(conn: &mut SqliteConnection, id: i64, password_hash: &str) -> AppResult<User> {
    let sql = format!(
        r#"UPDATE users SET password_hash = ?1, reset_token = NULL, reset_expires_at = NULL,
               updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now')
           WHERE id = ?2 RETURNING {}"#,
        USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&sql)
        .bind(password_hash)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_not_found("User")
}
