use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreateTodoRequest, DeletedTodoResponse, ListQuery, UpdateTodoRequest},
    repo_types::Todo,
    services::{self, TODO_NOT_FOUND},
};
use crate::{
    auth::AuthUser,
    error::{AppError, AppJson, AppQuery, AppResult},
    state::AppState,
};

pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/:id",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
}

/// A malformed id names no row the caller owns, so it is simply not found.
fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(TODO_NOT_FOUND))
}

#[instrument(skip(state, caller, body), fields(user_id = %caller.id))]
pub async fn create_todo(
    State(state): State<AppState>,
    caller: AuthUser,
    AppJson(body): AppJson<CreateTodoRequest>,
) -> AppResult<(StatusCode, Json<Todo>)> {
    let todo = services::create(state.todos.as_ref(), caller.id, body).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

#[instrument(skip(state, caller), fields(user_id = %caller.id))]
pub async fn list_todos(
    State(state): State<AppState>,
    caller: AuthUser,
    AppQuery(q): AppQuery<ListQuery>,
) -> AppResult<Json<Vec<Todo>>> {
    let todos = services::list(state.todos.as_ref(), caller.id, q).await?;
    Ok(Json(todos))
}

#[instrument(skip(state, caller), fields(user_id = %caller.id))]
pub async fn get_todo(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Todo>> {
    let todo = services::get(state.todos.as_ref(), caller.id, parse_id(&id)?).await?;
    Ok(Json(todo))
}

#[instrument(skip(state, caller, body), fields(user_id = %caller.id))]
pub async fn update_todo(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    AppJson(body): AppJson<UpdateTodoRequest>,
) -> AppResult<Json<Todo>> {
    let todo = services::update(state.todos.as_ref(), caller.id, parse_id(&id)?, body).await?;
    Ok(Json(todo))
}

#[instrument(skip(state, caller), fields(user_id = %caller.id))]
pub async fn delete_todo(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<DeletedTodoResponse>> {
    let id = services::delete(state.todos.as_ref(), caller.id, parse_id(&id)?).await?;
    Ok(Json(DeletedTodoResponse {
        message: "Todo removed",
        id,
    }))
}
