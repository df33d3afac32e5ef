use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{
        BatchUpdateStatusRequest, CreateTodoRequest, TodoQuery, UpdateStatusRequest,
        UpdateTodoRequest,
    },
    response,
    services::TodoService,
};
use actix_web::{delete, get, post, put, web, Responder};
use validator::Validate;

/// Lists the caller's todos.
///
/// ## Query Parameters:
/// - `page` (optional, default 1)
/// - `page_size` (optional, default 10, at most 100)
/// - `status` (optional): 0 pending, 1 in progress, 2 completed.
/// - `priority` (optional): 1 low to 4 urgent.
/// - `keyword` (optional): case-insensitive match on title or description.
///
/// ## Responses:
/// - `200 OK`: `{todos, pagination, statistics}`.
/// - `400 Bad Request`: out-of-range paging or unknown status/priority.
/// - `401 Unauthorized`: missing or invalid bearer token.
#[get("")]
pub async fn list_todos(
    service: web::Data<TodoService>,
    user: AuthenticatedUser,
    query: web::Query<TodoQuery>,
) -> Result<impl Responder, AppError> {
    query.validate()?;
    Ok(response::ok(service.list(&user, query.into_inner()).await?))
}

/// Creates a todo owned by the caller. Status defaults to pending, priority to low.
#[post("")]
pub async fn create_todo(
    service: web::Data<TodoService>,
    user: AuthenticatedUser,
    todo_data: web::Json<CreateTodoRequest>,
) -> Result<impl Responder, AppError> {
    todo_data.validate()?;
    Ok(response::ok(service.create(&user, todo_data.into_inner()).await?))
}

#[get("/statistics")]
pub async fn statistics(
    service: web::Data<TodoService>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    Ok(response::ok(service.statistics(&user).await?))
}

/// Sets one status on many todos.
///
/// Only ids owned by the caller are touched; the rest are ignored. Responds with
/// `{updated}`, the number of todos changed.
#[put("/batch/status")]
pub async fn batch_update_status(
    service: web::Data<TodoService>,
    user: AuthenticatedUser,
    batch: web::Json<BatchUpdateStatusRequest>,
) -> Result<impl Responder, AppError> {
    batch.validate()?;
    let result = service.batch_update_status(&user, batch.into_inner()).await?;
    Ok(response::ok(result))
}

/// ## Responses:
/// - `200 OK`: the todo.
/// - `403 Forbidden`: the todo belongs to another user.
/// - `404 Not Found`: no such todo, or it was deleted.
#[get("/{id}")]
pub async fn get_todo(
    service: web::Data<TodoService>,
    user: AuthenticatedUser,
    todo_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    Ok(response::ok(service.get(&user, todo_id.into_inner()).await?))
}

#[put("/{id}")]
pub async fn update_todo(
    service: web::Data<TodoService>,
    user: AuthenticatedUser,
    todo_id: web::Path<i64>,
    todo_data: web::Json<UpdateTodoRequest>,
) -> Result<impl Responder, AppError> {
    todo_data.validate()?;
    let todo = service
        .update(&user, todo_id.into_inner(), todo_data.into_inner())
        .await?;
    Ok(response::ok(todo))
}

/// Soft-deletes the todo. It no longer appears in reads or statistics.
#[delete("/{id}")]
pub async fn delete_todo(
    service: web::Data<TodoService>,
    user: AuthenticatedUser,
    todo_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    service.delete(&user, todo_id.into_inner()).await?;
    Ok(response::ok_empty())
}

#[put("/{id}/status")]
pub async fn update_todo_status(
    service: web::Data<TodoService>,
    user: AuthenticatedUser,
    todo_id: web::Path<i64>,
    status: web::Json<UpdateStatusRequest>,
) -> Result<impl Responder, AppError> {
    let todo = service
        .update_status(&user, todo_id.into_inner(), status.status)
        .await?;
    Ok(response::ok(todo))
}
