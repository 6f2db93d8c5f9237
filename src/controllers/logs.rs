//! Activity log endpoints. Callers only see and change their own entries;
//! another user's entry answers 404 rather than revealing it exists.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::error::{AppError, AppResult, OptionExt};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::AuthUser;
use crate::services::logs;
use crate::state::AppState;
use crate::types::{CreateLogRequest, ListLogsQuery, Log, UpdateLogRequest};

#[derive(Serialize)]
pub struct LogsResponse {
    pub items: Vec<Log>,
}

fn owned_by(log: Option<Log>, user_id: i64) -> AppResult<Log> {
    log.filter(|l| l.user_id == Some(user_id)).ok_or_not_found("Log")
}

/// POST /logs
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(mut req): AppJson<CreateLogRequest>,
) -> AppResult<(StatusCode, Json<Log>)> {
    match req.user_id {
        None => req.user_id = Some(auth.user_id),
        Some(id) if id != auth.user_id => {
            return Err(AppError::Forbidden("Cannot write log entries for another user".into()));
        }
        Some(_) => {}
    }
    req.validate()?;

    let mut conn = state.db.acquire().await?;
    let log = logs::create_log(&mut conn, &req).await?;
    state.metrics.add_logs_written(1);
    Ok((StatusCode::CREATED, Json(log)))
}

/// GET /logs
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    AppQuery(mut query): AppQuery<ListLogsQuery>,
) -> AppResult<Json<LogsResponse>> {
    query.user_id = Some(auth.user_id);
    let mut conn = state.db.acquire().await?;
    let items = logs::list_logs(&mut conn, &query).await?;
    Ok(Json(LogsResponse { items }))
}

/// GET /logs/{id}
pub async fn show(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<Log>> {
    let mut conn = state.db.acquire().await?;
    let log = owned_by(logs::get_log_by_id(&mut conn, id).await?, auth.user_id)?;
    Ok(Json(log))
}

/// PATCH /logs/{id}
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdateLogRequest>,
) -> AppResult<Json<Log>> {
    req.validate()?;

    let mut tx = state.db.begin().await?;
    owned_by(logs::get_log_by_id(&mut tx, id).await?, auth.user_id)?;
    let log = logs::update_log(&mut tx, id, &req).await?;
    tx.commit().await?;
    Ok(Json(log))
}

/// DELETE /logs/{id}
pub async fn destroy(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<Log>> {
    let mut tx = state.db.begin().await?;
    owned_by(logs::get_log_by_id(&mut tx, id).await?, auth.user_id)?;
    let log = logs::delete_log(&mut tx, id).await?;
    tx.commit().await?;
    tracing::info!(log_id = log.id, user_id = auth.user_id, "log deleted");
    Ok(Json(log))
}
