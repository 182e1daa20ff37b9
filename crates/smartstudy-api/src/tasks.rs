// Task CRUD HTTP routes

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde_json::Value;
use smartstudy_core::{NewTask, Task, TaskFilter, TaskPatch};

use crate::auth::AuthUser;
use crate::common::{ApiError, DeleteResponse, ErrorResponse};
use crate::events::{json_body, record_id};
use crate::state::AppState;

/// Create task routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/tasks", get(list_tasks).post(create_task))
        .route("/v1/tasks/:id", put(update_task).delete(delete_task))
        .with_state(state)
}

/// GET /v1/tasks - List the caller's tasks, newest first
#[utoipa::path(
    get,
    path = "/v1/tasks",
    responses(
        (status = 200, description = "All tasks of the caller"),
        (status = 401, description = "Authentication required")
    ),
    tag = "tasks"
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Task>>, ApiError> {
    let mut tasks = state
        .tasks()
        .find_many(&user.owner, &TaskFilter::default())
        .await?;
    tasks.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });

    Ok(Json(tasks))
}

/// POST /v1/tasks - Create a task
#[utoipa::path(
    post,
    path = "/v1/tasks",
    responses(
        (status = 201, description = "Task created"),
        (status = 400, description = "Body does not match the task schema", body = ErrorResponse),
        (status = 401, description = "Authentication required")
    ),
    tag = "tasks"
)]
pub async fn create_task(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let body = json_body(payload)?;
    let input = NewTask::from_value(&body).map_err(ApiError::InvalidBody)?;

    let task = state.tasks().create(&user.owner, input).await?;
    tracing::info!(owner = %user.owner, task_id = %task.id, "Created task");

    Ok((StatusCode::CREATED, Json(task)))
}

/// PUT /v1/tasks/{id} - Update a task
#[utoipa::path(
    put,
    path = "/v1/tasks/{id}",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task updated"),
        (status = 400, description = "Body does not match the task schema", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn update_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let body = json_body(payload)?;
    let patch = TaskPatch::from_value(&body).map_err(ApiError::InvalidBody)?;
    let uuid = record_id(&id)?;

    let task = state
        .tasks()
        .update_one(&user.owner, uuid, &patch)
        .await?
        .ok_or(ApiError::NotFound)?;
    tracing::info!(owner = %user.owner, task_id = %task.id, done = task.done, "Updated task");

    Ok(Json(task))
}

/// DELETE /v1/tasks/{id} - Delete a task
#[utoipa::path(
    delete,
    path = "/v1/tasks/{id}",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task deleted", body = DeleteResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn delete_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let uuid = record_id(&id)?;

    let task = state
        .tasks()
        .delete_one(&user.owner, uuid)
        .await?
        .ok_or(ApiError::NotFound)?;
    tracing::info!(owner = %user.owner, task_id = %task.id, "Deleted task");

    Ok(Json(DeleteResponse::new(task.id)))
}
