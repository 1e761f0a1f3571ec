use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::StatusCode,
    response::Json,
};

use crate::auth::AuthenticatedIdentity;
use crate::database::{Task, TaskPatch};
use crate::error::ApiError;
use crate::state::AppState;

fn task_not_found() -> ApiError {
    ApiError::not_found("Task not found")
}

/// GET /api/tasks/:id - fetch one task visible to the caller
pub async fn get(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Path(id): Path<i64>,
) -> Result<Json<Task>, ApiError> {
    let session = state.sessions.session(Some(&identity));
    state
        .tasks
        .get(&session, id)
        .await?
        .map(Json)
        .ok_or_else(task_not_found)
}

/// PUT /api/tasks/:id - partial update; an empty body returns the current task
pub async fn put(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Path(id): Path<i64>,
    body: Result<Json<TaskPatch>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let Json(patch) = body?;
    patch.validate()?;

    let session = state.sessions.session(Some(&identity));
    state
        .tasks
        .update(&session, id, &patch)
        .await?
        .map(Json)
        .ok_or_else(task_not_found)
}

/// DELETE /api/tasks/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let session = state.sessions.session(Some(&identity));
    if state.tasks.delete(&session, id).await? {
        tracing::info!("Deleted task {} for {}", id, identity.subject());
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(task_not_found())
    }
}
