use std::path::PathBuf;

use axum::body::Bytes;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use taskmgr::model::{CompletionLog, NewTask, TaskPatch, TaskView};
use taskmgr::ops;
use taskmgr::timefmt::format_instant;

use crate::error::ApiError;
use crate::state::AppState;

/// API routes, served at the root and again under `/api`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", put(update_task).delete(delete_task))
        .route("/tasks/{id}/complete", post(complete_task))
        .route("/logs", get(list_logs));

    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .with_state(state)
}

/// The full application: API routes, an optional static directory for
/// everything else, and permissive CORS.
pub fn app(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let mut app = router(state);
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }
    app.layer(CorsLayer::permissive())
}

/// Bodies are parsed regardless of content type; an empty body reads as `{}`.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))
}

/// GET /tasks
async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<TaskView>>, ApiError> {
    let views = state.with_conn(|conn, now| ops::list_tasks(conn, now)).await?;
    Ok(Json(views))
}

/// POST /tasks
async fn create_task(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let input: NewTask = parse_body(&body)?;
    let id = state
        .with_conn(move |conn, now| ops::create_task(conn, &input, now))
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// PUT /tasks/{id}
async fn update_task(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = path?;
    let patch: TaskPatch = parse_body(&body)?;
    state
        .with_conn(move |conn, now| ops::update_task(conn, id, &patch, now))
        .await?;
    Ok(Json(json!({ "ok": true })))
}

/// DELETE /tasks/{id}
async fn delete_task(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = path?;
    state
        .with_conn(move |conn, _| ops::delete_task(conn, id))
        .await?;
    Ok(Json(json!({ "ok": true })))
}

/// POST /tasks/{id}/complete
async fn complete_task(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = path?;
    let log = state
        .with_conn(move |conn, now| ops::complete_task(conn, id, now))
        .await?;
    Ok(Json(json!({
        "ok": true,
        "task_id": log.task_id,
        "title": log.title,
        "done_at": format_instant(log.done_at),
    })))
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    limit: Option<usize>,
}

/// GET /logs
async fn list_logs(
    State(state): State<AppState>,
    query: Result<Query<LogsQuery>, QueryRejection>,
) -> Result<Json<Vec<CompletionLog>>, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(ops::LOG_PAGE_SIZE);
    let logs = state
        .with_conn(move |conn, _| ops::list_logs(conn, limit))
        .await?;
    Ok(Json(logs))
}
