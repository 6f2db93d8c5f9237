//! Server-side sessions backing access tokens. A token is only honoured while
//! its row exists and `expires_at` is in the future.

use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::error::AppResult;
use crate::types::Session;

pub async fn create_session(conn: &mut SqliteConnection, user_id: i64, expires_at: i64) -> AppResult<Session> {
    let id = Uuid::new_v4().to_string();
    let session = sqlx::query_as::<_, Session>(
        "INSERT INTO sessions (id, user_id, expires_at) VALUES (?1, ?2, ?3) \
         RETURNING id, user_id, created_at, expires_at",
    )
    .bind(&id)
    .bind(user_id)
    .bind(expires_at)
    .fetch_one(&mut *conn)
    .await?;
    Ok(session)
}

pub async fn find_active_session(conn: &mut SqliteConnection, id: &str, now: i64) -> AppResult<Option<Session>> {
    let session = sqlx::query_as::<_, Session>(
        "SELECT id, user_id, created_at, expires_at FROM sessions WHERE id = ?1 AND expires_at > ?2",
    )
    .bind(id)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(session)
}

/// Returns whether a row was removed.
pub async fn delete_session(conn: &mut SqliteConnection, id: &str) -> AppResult<bool> {
    let res = sqlx::query("DELETE FROM sessions WHERE id = ?1").bind(id).execute(&mut *conn).await?;
    Ok(res.rows_affected() > 0)
}

pub async fn delete_user_sessions(conn: &mut SqliteConnection, user_id: i64) -> AppResult<u64> {
    let res = sqlx::query("DELETE FROM sessions WHERE user_id = ?1").bind(user_id).execute(&mut *conn).await?;
    Ok(res.rows_affected())
}

/// Drops expired rows; run periodically from `main`.
pub async fn purge_expired(conn: &mut SqliteConnection, now: i64) -> AppResult<u64> {
    let res = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?1").bind(now).execute(&mut *conn).await?;
    Ok(res.rows_affected())
}
