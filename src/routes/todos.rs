use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{Todo, TodoInput, TodoPatch},
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

const TODO_COLUMNS: &str = "id, title, completed, due_date, user_id, created_at";

/// Retrieves the full list of todos owned by the authenticated user.
///
/// Todos are ordered by creation date descending (newest first); the id is a
/// secondary sort key so repeated reads are stable when timestamps collide.
///
/// ## Responses:
/// - `200 OK`: Returns a JSON array of `Todo` objects.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `500 Internal Server Error`: For database errors.
#[get("")]
pub async fn list_todos(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let todos = sqlx::query_as::<_, Todo>(&format!(
        "SELECT {TODO_COLUMNS} FROM todos WHERE user_id = $1 ORDER BY created_at DESC, id"
    ))
    .bind(user.0)
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(todos))
}

/// Creates a new todo owned by the authenticated user.
///
/// ## Request Body:
/// A JSON object matching `TodoInput`:
/// - `title`: The title of the todo (required, non-blank).
/// - `completed` (optional): Initial completion state, defaults to false.
/// - `dueDate` (optional): The due date for the todo.
///
/// ## Responses:
/// - `201 Created`: Returns the newly created `Todo` object as JSON.
/// - `400 Bad Request`: If the title is empty or whitespace-only.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `500 Internal Server Error`: For database errors.
#[post("")]
pub async fn create_todo(
    pool: web::Data<PgPool>,
    todo_data: web::Json<TodoInput>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    // Validate input before anything is persisted
    todo_data.validate()?;

    let todo = sqlx::query_as::<_, Todo>(&format!(
        "INSERT INTO todos (id, title, completed, due_date, user_id)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {TODO_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&todo_data.title)
    .bind(todo_data.completed.unwrap_or(false))
    .bind(todo_data.due_date)
    .bind(user.0)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Created().json(todo))
}

/// Resolves the owner of a todo, if the todo exists.
async fn fetch_owner(pool: &PgPool, todo_id: Uuid) -> Result<Option<Uuid>, AppError> {
    let owner = sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM todos WHERE id = $1")
        .bind(todo_id)
        .fetch_optional(pool)
        .await?;
    Ok(owner)
}

/// Checks that `todo_id` exists and is owned by `user_id`.
///
/// Nonexistent and non-owned todos are indistinguishable to the caller: both
/// produce the same 404, so existence is never leaked to non-owners.
async fn require_owner(pool: &PgPool, todo_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    match fetch_owner(pool, todo_id).await? {
        Some(owner) if owner == user_id => Ok(()),
        _ => Err(AppError::NotFound("Todo not found".into())),
    }
}

/// Updates a todo owned by the authenticated user.
///
/// Applies a partial patch: only `title`, `completed`, and `dueDate` can
/// change, and fields absent from the body keep their current value. An
/// explicit `"dueDate": null` clears a previously set due date.
/// Ownership is verified before any mutation.
///
/// ## Path Parameters:
/// - `id`: The UUID of the todo to update.
///
/// ## Responses:
/// - `200 OK`: Returns the updated `Todo` object as JSON.
/// - `400 Bad Request`: If a supplied title is blank.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `404 Not Found`: If the todo does not exist or is not owned by the caller.
/// - `500 Internal Server Error`: For database errors.
#[put("/{id}")]
pub async fn update_todo(
    pool: web::Data<PgPool>,
    todo_id: web::Path<Uuid>,
    patch: web::Json<TodoPatch>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    patch.validate()?;
    let todo_id = todo_id.into_inner();

    require_owner(&pool, todo_id, user.0).await?;

    // `due_date` needs its own branch: a COALESCE cannot express "set to
    // NULL", which is what an explicit `"dueDate": null` asks for.
    let todo = match patch.due_date {
        Some(due_date) => {
            sqlx::query_as::<_, Todo>(&format!(
                "UPDATE todos
                 SET title = COALESCE($1, title),
                     completed = COALESCE($2, completed),
                     due_date = $3
                 WHERE id = $4 AND user_id = $5
                 RETURNING {TODO_COLUMNS}"
            ))
            .bind(&patch.title)
            .bind(patch.completed)
            .bind(due_date)
            .bind(todo_id)
            .bind(user.0)
            .fetch_one(&**pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Todo>(&format!(
                "UPDATE todos
                 SET title = COALESCE($1, title),
                     completed = COALESCE($2, completed)
                 WHERE id = $3 AND user_id = $4
                 RETURNING {TODO_COLUMNS}"
            ))
            .bind(&patch.title)
            .bind(patch.completed)
            .bind(todo_id)
            .bind(user.0)
            .fetch_one(&**pool)
            .await?
        }
    };

    Ok(HttpResponse::Ok().json(todo))
}

/// Deletes a todo owned by the authenticated user.
///
/// Deletion is permanent and not idempotent: a second delete of the same id
/// fails with 404.
///
/// ## Path Parameters:
/// - `id`: The UUID of the todo to delete.
///
/// ## Responses:
/// - `200 OK`: `{"message": "Todo removed"}` on success.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `404 Not Found`: If the todo does not exist or is not owned by the caller.
/// - `500 Internal Server Error`: For database errors.
#[delete("/{id}")]
pub async fn delete_todo(
    pool: web::Data<PgPool>,
    todo_id: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let todo_id = todo_id.into_inner();

    require_owner(&pool, todo_id, user.0).await?;

    let result = sqlx::query("DELETE FROM todos WHERE id = $1 AND user_id = $2")
        .bind(todo_id)
        .bind(user.0)
        .execute(&**pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Todo not found".into()));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Todo removed" })))
}
