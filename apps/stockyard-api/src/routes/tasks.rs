//! Task endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use stockyard_core::{Page, Task, TaskPayload, TaskStatus};

use crate::error::{ApiError, ApiResult};
use crate::extract::{Actor, ApiJson, ApiQuery};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<TaskStatus>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub payload: TaskPayload,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub assignee: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub status: TaskStatus,
    pub notes: Option<String>,
}

/// `GET /tasks?status=&limit=&offset=`
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ListTasksQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let page = Page::new(query.limit, query.offset);
    Ok(Json(state.db.tasks().list(query.status, page).await?))
}

/// `POST /tasks`
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = state
        .db
        .tasks()
        .create_task(actor.as_str(), req.payload, req.notes.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// `GET /tasks/{id}`
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Task>> {
    state
        .db
        .tasks()
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Task not found: {}", id)))
}

/// `POST /tasks/{id}/assign`
pub async fn assign_task(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<AssignRequest>,
) -> ApiResult<Json<Task>> {
    let task = state
        .db
        .tasks()
        .assign_task(actor.as_str(), id, &req.assignee)
        .await?;
    Ok(Json(task))
}

/// `PATCH /tasks/{id}`
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let task = state
        .db
        .tasks()
        .update_task_status(actor.as_str(), id, req.status, req.notes.as_deref())
        .await?;
    Ok(Json(task))
}
