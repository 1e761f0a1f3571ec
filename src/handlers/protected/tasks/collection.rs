use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    http::StatusCode,
    response::Json,
};

use crate::auth::AuthenticatedIdentity;
use crate::database::{NewTask, Task};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/tasks - list the caller's tasks, oldest first
pub async fn get(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedIdentity>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let session = state.sessions.session(Some(&identity));
    let tasks = state.tasks.list(&session).await?;
    Ok(Json(tasks))
}

/// POST /api/tasks - create a task owned by the caller
pub async fn post(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    body: Result<Json<NewTask>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let Json(new_task) = body?;
    new_task.validate()?;

    let session = state.sessions.session(Some(&identity));
    let task = state.tasks.create(&session, &new_task).await?;

    tracing::info!("Created task {} for {}", task.id, identity.subject());
    Ok((StatusCode::CREATED, Json(task)))
}
