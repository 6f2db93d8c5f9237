//! Activity log persistence.
//!
//! Every function takes the connection to run on, so callers can compose
//! several calls inside one `sqlx::Transaction` (`&mut *tx`) or use a plain
//! pooled connection for one-off reads.

use sqlx::SqliteConnection;

use crate::error::{AppResult, OptionExt};
use crate::types::{CreateLogRequest, ListLogsQuery, Log, UpdateLogRequest};

const LOG_COLUMNS: &str = "id, user_id, level, action, message, details, created_at, updated_at";

pub async fn create_log(conn: &mut SqliteConnection, data: &CreateLogRequest) -> AppResult<Log> {
    let sql = format!(
        "INSERT INTO logs (user_id, level, action, message, details) VALUES (?1, ?2, ?3, ?4, ?5) RETURNING {}",
        LOG_COLUMNS
    );
    let log = sqlx::query_as::<_, Log>(&sql)
        .bind(data.user_id)
        .bind(data.level)
        .bind(data.action.trim())
        .bind(&data.message)
        .bind(&data.details)
        .fetch_one(&mut *conn)
        .await?;
    tracing::debug!(log_id = log.id, action = %log.action, "log created");
    Ok(log)
}

pub async fn get_log_by_id(conn: &mut SqliteConnection, id: i64) -> AppResult<Option<Log>> {
    let sql = format!("SELECT {} FROM logs WHERE id = ?1", LOG_COLUMNS);
    let log = sqlx::query_as::<_, Log>(&sql).bind(id).fetch_optional(&mut *conn).await?;
    Ok(log)
}

/// Applies the fields present in `data` (`details: Some(None)` clears it);
/// returns `NotFound` for an unknown id.
pub async fn update_log(conn: &mut SqliteConnection, id: i64, data: &UpdateLogRequest) -> AppResult<Log> {
    let sql = format!(
        r#"UPDATE logs SET
            level = COALESCE(?1, level),
            action = COALESCE(?2, action),
            message = COALESCE(?3, message),
            details = CASE WHEN ?4 THEN ?5 ELSE details END,
            updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now')
           WHERE id = ?6
           RETURNING {}"#,
        LOG_COLUMNS
    );
    sqlx::query_as::<_, Log>(&sql)
        .bind(data.level)
        .bind(data.action.as_deref().map(str::trim))
        .bind(&data.message)
        .bind(data.details.is_some())
        .bind(data.details.clone().flatten())
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_not_found("Log")
}

/// Deletes the row with `id` and returns it; `NotFound` if there was none.
pub async fn delete_log(conn: &mut SqliteConnection, id: i64) -> AppResult<Log> {
    let sql = format!("DELETE FROM logs WHERE id = ?1 RETURNING {}", LOG_COLUMNS);
    sqlx::query_as::<_, Log>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_not_found("Log")
}

/// Newest first, filtered by user and level when given.
pub async fn list_logs(conn: &mut SqliteConnection, query: &ListLogsQuery) -> AppResult<Vec<Log>> {
    let sql = format!(
        r#"SELECT {} FROM logs
           WHERE (?1 IS NULL OR user_id = ?1)
             AND (?2 IS NULL OR level = ?2)
           ORDER BY id DESC
           LIMIT ?3 OFFSET ?4"#,
        LOG_COLUMNS
    );
    let logs = sqlx::query_as::<_, Log>(&sql)
        .bind(query.user_id)
        .bind(query.level)
        .bind(query.limit())
        .bind(query.offset())
        .fetch_all(&mut *conn)
        .await?;
    Ok(logs)
}
