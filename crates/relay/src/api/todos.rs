use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
};
use donelist_common::{
    error::MutationError,
    protocol::api::{CreateTodoRequest, TodoEnvelope, TodosEnvelope},
    service::TodoService,
    types::TodoId,
};

use crate::{auth::middleware::AuthenticatedUser, validation::ValidatedJson};

use super::{ApiError, ApiState};

/// Unparseable ids are reported exactly like missing rows.
fn parse_todo_id(raw: &str) -> Result<TodoId, ApiError> {
    raw.parse::<TodoId>().map_err(|_| MutationError::NotFoundOrForbidden.into())
}

pub(super) async fn list_todos(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<TodosEnvelope>, ApiError> {
    let todos = state.store.list(&user.session()).await?;
    Ok(Json(TodosEnvelope { todos }))
}

pub(super) async fn create_todo(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(payload): ValidatedJson<CreateTodoRequest>,
) -> Result<(StatusCode, Json<TodoEnvelope>), ApiError> {
    let todo = state.store.create(&user.session(), &payload.title).await?;
    Ok((StatusCode::CREATED, Json(TodoEnvelope { todo })))
}

pub(super) async fn toggle_todo(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(raw_id): Path<String>,
) -> Result<Json<TodoEnvelope>, ApiError> {
    let id = parse_todo_id(&raw_id)?;
    let todo = state.store.toggle(&user.session(), id).await?;
    Ok(Json(TodoEnvelope { todo }))
}

pub(super) async fn delete_todo(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_todo_id(&raw_id)?;
    state.store.delete(&user.session(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
