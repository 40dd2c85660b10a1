use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        validate_description, validate_title, CreateTodoRequest, ListQuery, TodoCreated,
        TodoItem, TodoPage, TodoUpdated, UpdateTodoRequest,
    },
    repo::Todo,
};
use crate::{
    auth::extractors::AuthUser, error::ApiError, extract::ValidJson, state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/:id", put(update_todo).delete(delete_todo))
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::Validation("Invalid ID".into()))
}

#[instrument(skip(state, payload))]
pub async fn create_todo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(payload): ValidJson<CreateTodoRequest>,
) -> Result<(StatusCode, Json<TodoCreated>), ApiError> {
    let title = validate_title(&payload.title)?;
    let description = validate_description(payload.description.as_deref().unwrap_or(""))?;
    let completed = payload.completed.unwrap_or(false);

    let todo = Todo::insert(&state.db, user_id, &title, &description, completed).await?;

    info!(user_id = %user_id, todo_id = %todo.id, "todo created");
    Ok((
        StatusCode::CREATED,
        Json(TodoCreated {
            id: todo.id,
            title: todo.title,
            description: todo.description,
            completed: todo.completed,
            created_at: todo.created_at,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_todos(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<TodoPage>, ApiError> {
    let page = query.page();
    let limit = query.limit();
    let pattern = query.like_pattern();

    let total = Todo::count_for_user(&state.db, user_id, pattern.as_deref()).await?;
    let todos = Todo::list_for_user(
        &state.db,
        user_id,
        pattern.as_deref(),
        query.sort_column(),
        query.descending(),
        limit,
        (page - 1) * limit,
    )
    .await?;

    Ok(Json(TodoPage {
        data: todos.into_iter().map(TodoItem::from).collect(),
        page,
        limit,
        total,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_todo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<UpdateTodoRequest>,
) -> Result<Json<TodoUpdated>, ApiError> {
    let id = parse_id(&id)?;

    let todo = Todo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".into()))?;
    if todo.user_id != user_id {
        warn!(user_id = %user_id, todo_id = %id, "update on foreign todo");
        return Err(ApiError::Forbidden);
    }

    let title = match payload.title.as_deref() {
        Some(raw) => Some(validate_title(raw)?),
        None => None,
    };
    let description = match payload.description.as_deref() {
        Some(raw) => Some(validate_description(raw)?),
        None => None,
    };

    // Re-checks id and owner atomically; a concurrent delete surfaces here
    // as zero rows.
    let updated = Todo::update_fields(
        &state.db,
        id,
        user_id,
        title.as_deref(),
        description.as_deref(),
        payload.completed,
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Not found".into()))?;

    info!(user_id = %user_id, todo_id = %id, "todo updated");
    Ok(Json(TodoUpdated {
        id: updated.id,
        title: updated.title,
        description: updated.description,
        completed: updated.completed,
        updated_at: updated.updated_at,
    }))
}

#[instrument(skip(state))]
pub async fn delete_todo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;

    let todo = Todo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".into()))?;
    if todo.user_id != user_id {
        warn!(user_id = %user_id, todo_id = %id, "delete on foreign todo");
        return Err(ApiError::Forbidden);
    }

    if !Todo::delete(&state.db, id, user_id).await? {
        return Err(ApiError::NotFound("Not found".into()));
    }

    info!(user_id = %user_id, todo_id = %id, "todo deleted");
    Ok(StatusCode::NO_CONTENT)
}
